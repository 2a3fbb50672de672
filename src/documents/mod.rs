pub mod mapper;

pub use mapper::{DocumentMapper, Quotation, QuotationItem, RequestForQuotation, RfqItem};
