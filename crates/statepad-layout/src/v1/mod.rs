mod layout;
mod parse;

use thiserror::Error;

pub(crate) use layout::LayoutV1;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid state format: {0}")]
    InvalidStateFormat(String),
    #[error("layout \"{0}\" needs a format and size or a layout to extend")]
    MissingBase(String),
    #[error("invalid format \"{code}\" for control \"{control}\"")]
    InvalidFormat { control: String, code: String },
    #[error("invalid kind \"{kind}\" for control \"{control}\"")]
    InvalidKind { control: String, kind: String },
    #[error("control \"{control}\" is missing \"{field}\"")]
    MissingField {
        control: String,
        field: &'static str,
    },
    #[error("invalid capability: {0}")]
    InvalidCapability(String),
}
