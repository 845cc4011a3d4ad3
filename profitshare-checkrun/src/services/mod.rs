//! Service layer for the check production pipeline

pub mod file_transfer;
pub mod micr;
pub mod orchestrator;
pub mod positive_pay;
pub mod print_file;
pub mod printer;
pub mod workflow;

pub use file_transfer::{FileTransferService, FileTransport, OutboxTransport};
pub use micr::{MicrFormatter, MicrFormatterRegistry, ProfitShareStockFormatter};
pub use orchestrator::CheckRunOrchestrator;
pub use positive_pay::PositivePayService;
pub use print_file::CheckRunPrintFileService;
pub use workflow::CheckRunWorkflowService;
