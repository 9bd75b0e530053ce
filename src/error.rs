use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not open the catalog")]
    Catalog,
    #[display("could not open storage")]
    Storage,
    #[display("library operation failed")]
    Shelf,
    #[display("could not write output file")]
    Output,
}
