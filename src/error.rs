use snafu::Snafu;

/// The public Error type for this library.
#[derive(Debug, Snafu)]
pub struct Error(LibError);

/// The public Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// The internal Result type for this library.
pub(crate) type LibResult<T> = std::result::Result<T, LibError>;

impl From<LibError> for Error {
    fn from(err: LibError) -> Self {
        Error(err)
    }
}

/// The internal Error type for this library.
#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub(crate) enum LibError {
    #[snafu(display("{}: io error: {}", site, source))]
    Io { site: String, source: std::io::Error },

    #[snafu(display("{}: error while reading bytes: {}", site, source))]
    Bytes {
        site: String,
        source: crate::byte_iter::ByteError,
    },

    #[snafu(display("{}: malformed SMF data: {}", site, description))]
    Format { site: String, description: String },

    #[snafu(display("{}: could not parse meta-text: {}", site, description))]
    Parse { site: String, description: String },

    #[snafu(display("{}: unresolved reference: {}", site, description))]
    Resolve { site: String, description: String },

    #[snafu(display("{}: value out of range: {}", site, description))]
    Range { site: String, description: String },
}

macro_rules! site {
    () => {
        format!("{}:{}", file!(), line!())
    };
}

macro_rules! io {
    () => {
        crate::error::Io { site: site!() }
    };
}

macro_rules! bytes {
    () => {
        crate::error::Bytes { site: site!() }
    };
}

macro_rules! format_e {
    ($msg:expr) => {
        crate::error::Format {
            site: site!(),
            description: $msg,
        }
        .build()
    };
    ($fmt:expr, $($arg:expr),+) => {
        crate::error::Format {
            site: site!(),
            description: format!($fmt, $($arg),+),
        }
        .build()
    };
}

macro_rules! format_r {
    ($msg:expr) => {
        Err(format_e!($msg))
    };
    ($fmt:expr, $($arg:expr),+) => {
        Err(format_e!($fmt, $($arg),+))
    };
}

macro_rules! parse_e {
    ($msg:expr) => {
        crate::error::Parse {
            site: site!(),
            description: $msg,
        }
        .build()
    };
    ($fmt:expr, $($arg:expr),+) => {
        crate::error::Parse {
            site: site!(),
            description: format!($fmt, $($arg),+),
        }
        .build()
    };
}

macro_rules! parse_r {
    ($msg:expr) => {
        Err(parse_e!($msg))
    };
    ($fmt:expr, $($arg:expr),+) => {
        Err(parse_e!($fmt, $($arg),+))
    };
}

macro_rules! resolve_e {
    ($msg:expr) => {
        crate::error::Resolve {
            site: site!(),
            description: $msg,
        }
        .build()
    };
    ($fmt:expr, $($arg:expr),+) => {
        crate::error::Resolve {
            site: site!(),
            description: format!($fmt, $($arg),+),
        }
        .build()
    };
}

macro_rules! resolve_r {
    ($msg:expr) => {
        Err(resolve_e!($msg))
    };
    ($fmt:expr, $($arg:expr),+) => {
        Err(resolve_e!($fmt, $($arg),+))
    };
}

macro_rules! range_e {
    ($msg:expr) => {
        crate::error::Range {
            site: site!(),
            description: $msg,
        }
        .build()
    };
    ($fmt:expr, $($arg:expr),+) => {
        crate::error::Range {
            site: site!(),
            description: format!($fmt, $($arg),+),
        }
        .build()
    };
}

macro_rules! range_r {
    ($msg:expr) => {
        Err(range_e!($msg))
    };
    ($fmt:expr, $($arg:expr),+) => {
        Err(range_e!($fmt, $($arg),+))
    };
}

#[test]
fn site_test() {
    let line = line!() + 1;
    let site = site!();
    assert!(site.contains("error.rs"));
    assert!(site.contains(format!("{}", line).as_str()));
}

#[test]
fn format_macros_test_message() {
    fn foo() -> LibResult<u64> {
        format_r!("bad chunk tag")
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("bad chunk tag"));
}

#[test]
fn parse_macros_test_fmt() {
    fn foo() -> LibResult<u64> {
        parse_r!("line {} missing '=': {}", 3, "Foo")
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("line 3 missing"));
}

#[test]
fn resolve_macros_test() {
    fn foo() -> LibResult<u64> {
        resolve_r!("no handle block for h#{}", 12)
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("h#12"));
}

#[test]
fn range_macros_test() {
    fn foo() -> LibResult<u64> {
        range_r!("note number {} outside [0,127]", 200)
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("outside [0,127]"));
}
