//! Certificate issuance: the single-certificate path, bulk batches and
//! certificate ID minting.

mod bulk;
mod id;
mod issuer;
mod single;


pub use bulk::{BatchResult, BatchRow, RowError, RowLayout, SharedFields};
pub use id::{IdGenerator, UuidGenerator, certificate_number};
pub use issuer::{CertificateIssuer, IssuanceError};
pub use single::NewCertificateRequest;
