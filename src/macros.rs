//===========================================================================//

macro_rules! fail {
    ($kind:ident, $e:expr) => {
        return Err($crate::error::Error::$kind(::std::string::String::from(
            $e,
        )))
    };
    ($kind:ident, $fmt:expr, $($arg:tt)+) => {
        return Err($crate::error::Error::$kind(format!($fmt, $($arg)+)))
    };
}

macro_rules! malformed {
    ($($arg:tt)+) => { fail!(MalformedHeader, $($arg)+) };
}

macro_rules! unsupported {
    ($($arg:tt)+) => { fail!(UnsupportedFormat, $($arg)+) };
}

macro_rules! truncated {
    ($($arg:tt)+) => { fail!(TruncatedInput, $($arg)+) };
}

macro_rules! bad_dimensions {
    ($($arg:tt)+) => { fail!(DimensionError, $($arg)+) };
}

macro_rules! over_capacity {
    ($($arg:tt)+) => { fail!(CapacityExceeded, $($arg)+) };
}

macro_rules! invalid_config {
    ($($arg:tt)+) => { fail!(InvalidConfig, $($arg)+) };
}

//===========================================================================//
