//! Client orchestrator: one session, two producers and an inbound dispatcher.
//!
//! The handshake and transfer producers run as independent tasks and may
//! interleave on the wire. Their results are joined and reported; a failing
//! producer never takes its sibling down.

use std::future::Future;
use std::sync::Arc;

use wsdrop_core::config::WsdropConfig;

use crate::dispatch::{InboundDispatcher, InboundSummary};
use crate::error::{ConnectError, ProducerError};
use crate::handshake;
use crate::identity::{self, Entropy, OsEntropy};
use crate::session::Session;
use crate::transfer::{self, TransferReport, TransferRequest};

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Interrupt arrived first. Producers were aborted, in-flight writes lost.
    Interrupted,
    /// Both producers finished and the inbound sequence ended.
    Completed {
        handshake: Result<(), ProducerError>,
        transfer: Result<TransferReport, ProducerError>,
        inbound: InboundSummary,
    },
}

pub struct Client {
    config: WsdropConfig,
    entropy: Arc<dyn Entropy>,
}

impl Client {
    pub fn new(config: WsdropConfig) -> Self {
        Self {
            config,
            entropy: Arc::new(OsEntropy),
        }
    }

    /// Replace the source of identity and file-name suffixes.
    pub fn with_entropy(mut self, entropy: Arc<dyn Entropy>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Connect, run both producers and the inbound dispatcher, and wait for
    /// `interrupt` or for everything to finish.
    ///
    /// Only a connection failure is returned as an error; producer failures
    /// are reported inside `RunOutcome::Completed`.
    pub async fn run<F>(self, interrupt: F) -> Result<RunOutcome, ConnectError>
    where
        F: Future<Output = ()>,
    {
        let (session, inbound) = Session::connect(&self.config.server.url).await?;

        let identity = identity::client_identity(
            &self.config.identity.client_name,
            self.entropy.as_ref(),
            self.config.identity.suffix_range,
        );
        let request = TransferRequest {
            path: self.config.transfer.file_path.clone(),
            file_name: identity::remote_file_name(
                &self.config.transfer.file_path,
                &self.config.transfer.remote_name,
                self.entropy.as_ref(),
                self.config.identity.suffix_range,
            ),
            policy: self.config.transfer.split_policy(),
        };
        let storage = self
            .config
            .receive
            .save_files
            .then(|| self.config.receive.storage_path.clone());

        let handshake_task = tokio::spawn(handshake::send_initial(session.clone(), identity));
        let transfer_task = tokio::spawn(transfer::send_file(session.clone(), request));
        let dispatcher =
            InboundDispatcher::new(storage).with_limits(self.config.receive.reassembly_limits());
        let inbound_task = tokio::spawn(dispatcher.run(inbound));

        let aborts = [
            handshake_task.abort_handle(),
            transfer_task.abort_handle(),
            inbound_task.abort_handle(),
        ];

        let close_when_done = self.config.transfer.close_when_done;
        let completion = {
            let session = session.clone();
            async move {
                let handshake = joined(handshake_task.await);
                let transfer = joined(transfer_task.await);
                if close_when_done {
                    session.close();
                }
                let inbound = inbound_task.await.unwrap_or_else(|e| {
                    tracing::error!(error = %e, "inbound dispatcher failed");
                    InboundSummary::default()
                });
                (handshake, transfer, inbound)
            }
        };

        tokio::select! {
            _ = interrupt => {
                tracing::info!("interrupt");
                for task in &aborts {
                    task.abort();
                }
                session.shutdown();
                Ok(RunOutcome::Interrupted)
            }
            (handshake, transfer, inbound) = completion => {
                tracing::info!("done");
                session.close();
                session.closed().await;
                Ok(RunOutcome::Completed { handshake, transfer, inbound })
            }
        }
    }
}

fn joined<T>(
    result: Result<Result<T, ProducerError>, tokio::task::JoinError>,
) -> Result<T, ProducerError> {
    result.map_err(ProducerError::from).and_then(|r| r)
}
