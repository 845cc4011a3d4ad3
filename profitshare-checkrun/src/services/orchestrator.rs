//! Check run orchestration
//!
//! Composes print file generation, positive pay generation, and file
//! transfer into one logical run with per-step failure reporting. The
//! steps are independently retryable rather than one transaction: a
//! shipped financial file cannot be rolled back by a database abort.

use profitshare_common::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::models::CheckRunStartRequest;
use crate::services::file_transfer::{FileTransferService, FileTransport};
use crate::services::positive_pay::PositivePayService;
use crate::services::print_file::CheckRunPrintFileService;

/// Coordinates the full check run. Owns no data; every durable record is
/// written by the service that owns it.
pub struct CheckRunOrchestrator<T: FileTransport> {
    print_file: CheckRunPrintFileService,
    positive_pay: PositivePayService,
    transfer: FileTransferService<T>,
    outbound_path: String,
}

impl<T: FileTransport> CheckRunOrchestrator<T> {
    pub fn new(
        print_file: CheckRunPrintFileService,
        positive_pay: PositivePayService,
        transfer: FileTransferService<T>,
        outbound_path: String,
    ) -> Self {
        Self {
            print_file,
            positive_pay,
            transfer,
            outbound_path,
        }
    }

    /// Execute a check run end to end.
    ///
    /// Returns `Ok(true)` when every step succeeded. Returns `Ok(false)`
    /// when the check file shipped but the positive pay leg failed; the
    /// checks are live at the bank, so this is a partial success needing
    /// manual follow-up, not a rollback. Any failure before the check file
    /// ships is an error: nothing left the building.
    pub async fn execute_check_run(
        &self,
        request: &CheckRunStartRequest,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        info!(
            profit_year = request.profit_year,
            starting_check_number = request.starting_check_number,
            user = %request.user_name,
            is_reprint = request.is_reprint,
            "Executing check run"
        );

        // Generation failure means no partial shipment of an inconsistent
        // batch: fail fast before any transfer.
        let print_result = self.print_file.generate(request).await.map_err(|err| {
            error!(
                profit_year = request.profit_year,
                error = %err,
                "Check print file generation failed; run aborted before transfer"
            );
            err
        })?;

        let run_id = print_result.run_id;

        self.transfer
            .transfer(
                print_result.content.as_bytes(),
                &self.outbound_path,
                &print_result.file_name,
                Some(&request.user_name),
                Some(run_id),
                cancel,
            )
            .await
            .map_err(|err| {
                error!(
                    %run_id,
                    profit_year = request.profit_year,
                    file_name = %print_result.file_name,
                    error = %err,
                    "Check file transfer failed; run aborted"
                );
                err
            })?;

        info!(
            %run_id,
            profit_year = request.profit_year,
            file_name = %print_result.file_name,
            check_count = print_result.check_count,
            "Check file generated and transferred"
        );

        // The check file is live at the bank from here on: positive pay
        // problems are surfaced as partial success, never silent success.
        let positive_pay_ok = match self.positive_pay.generate(request.profit_year).await {
            Ok(bytes) => {
                let file_name = format!("POSPAY_{}.csv", request.profit_year);
                match self
                    .transfer
                    .transfer(
                        &bytes,
                        &self.outbound_path,
                        &file_name,
                        Some(&request.user_name),
                        Some(run_id),
                        cancel,
                    )
                    .await
                {
                    Ok(_) => {
                        info!(%run_id, profit_year = request.profit_year, file_name, "Positive pay file transferred");
                        true
                    }
                    Err(err) => {
                        warn!(
                            %run_id,
                            profit_year = request.profit_year,
                            file_name,
                            error = %err,
                            "Positive pay transfer failed after check file shipped; manual follow-up required"
                        );
                        false
                    }
                }
            }
            Err(err) => {
                warn!(
                    %run_id,
                    profit_year = request.profit_year,
                    error = %err,
                    "Positive pay generation failed after check file shipped; manual follow-up required"
                );
                false
            }
        };

        info!(
            %run_id,
            profit_year = request.profit_year,
            complete = positive_pay_ok,
            "Check run finished"
        );

        Ok(positive_pay_ok)
    }
}
