use std::{
    io,
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    sync::mpsc,
    thread,
};

use log::{info, warn};
use thiserror::Error;

use crate::{
    arith::fold_mod,
    endpoint::ServerEndpoint,
    partition::{PartitionError, Span, partition},
};

use super::{ComputationRequest, PartialResult, ProtocolTransport, RequestError, TransportError};

/// The computation could not be planned; nothing was sent.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error("invalid computation: {0}")]
    InvalidRequest(#[from] RequestError),
}

/// One server failed to deliver its partial result.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        endpoint: ServerEndpoint,
        source: io::Error,
    },
    #[error("no address found for {0}")]
    Unresolved(ServerEndpoint),
    #[error("connection to {endpoint} failed: {source}")]
    Connect {
        endpoint: ServerEndpoint,
        source: io::Error,
    },
    #[error("exchange with {endpoint} failed: {source}")]
    Transport {
        endpoint: ServerEndpoint,
        source: TransportError,
    },
    #[error("{0} closed the connection without replying")]
    ClosedByPeer(ServerEndpoint),
    #[error("failed to start session for {endpoint}: {source}")]
    WorkerSpawn {
        endpoint: ServerEndpoint,
        source: io::Error,
    },
}

/// What one server was asked to do and how it went.
#[derive(Debug)]
pub struct Assignment {
    pub endpoint: ServerEndpoint,
    pub span: Span,
    pub outcome: Result<PartialResult, DispatchError>,
}

#[derive(Debug)]
pub struct DispatchReport {
    pub k: u64,
    pub modulus: u64,
    /// One entry per server, in server-list order.
    pub assignments: Vec<Assignment>,
    /// Product of every partial result that arrived.
    pub result: u64,
}

impl DispatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(|a| a.outcome.is_err())
    }

    /// `true` when every server replied, i.e. `result` really is `k! mod modulus`.
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Splits `1..=k` across a fixed list of servers and multiplies their replies.
///
/// Each server gets one session on its own thread; all sessions are started before any is
/// waited on. A server that cannot be resolved, reached, or does not answer simply
/// contributes nothing, so its span is missing from the final product. There is no retry
/// and no redistribution of the lost span: check [`DispatchReport::is_complete`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    endpoints: Vec<ServerEndpoint>,
}

impl Dispatcher {
    pub fn new(endpoints: Vec<ServerEndpoint>) -> Self {
        Self { endpoints }
    }

    pub fn dispatch(&self, k: u64, modulus: u64) -> Result<DispatchReport, PlanError> {
        ComputationRequest::new(Span::new(1, k), modulus).validate()?;
        let plan = partition(1, k, self.endpoints.len())?;

        let (tx, rx) = mpsc::channel();
        let mut sessions = Vec::with_capacity(plan.len());

        // Arrival order; folded after every session has finished.
        let mut arrivals = Vec::with_capacity(plan.len());

        thread::scope(|scope| {
            for (index, (endpoint, span)) in self.endpoints.iter().zip(&plan).enumerate() {
                info!("server {index}: {endpoint} - range {span}");

                let tx = tx.clone();
                let req = ComputationRequest::new(*span, modulus);
                let spawned = thread::Builder::new()
                    .name(format!("session-{index}"))
                    .spawn_scoped(scope, move || {
                        let outcome = exchange(endpoint, req).map(|value| PartialResult {
                            span: req.span(),
                            value,
                        });
                        // The receiver outlives every session.
                        let _ = tx.send((index, outcome));
                    });

                if let Err(source) = spawned {
                    let err = DispatchError::WorkerSpawn {
                        endpoint: endpoint.clone(),
                        source,
                    };
                    sessions.push((index, Err(err)));
                }
            }
            drop(tx);

            for (index, outcome) in rx {
                if let Ok(partial) = &outcome {
                    arrivals.push(partial.value);
                }
                sessions.push((index, outcome));
            }
        });

        sessions.sort_by_key(|(index, _)| *index);
        let assignments = self
            .endpoints
            .iter()
            .zip(plan)
            .zip(sessions)
            .map(|((endpoint, span), (_, outcome))| {
                match &outcome {
                    Ok(partial) => info!("server {endpoint} returned: {}", partial.value),
                    Err(e) => warn!("server {endpoint} contributes nothing: {e}"),
                }
                Assignment {
                    endpoint: endpoint.clone(),
                    span,
                    outcome,
                }
            })
            .collect::<Vec<_>>();

        let result = fold_mod(arrivals, modulus);

        Ok(DispatchReport {
            k,
            modulus,
            assignments,
            result,
        })
    }
}

/// Send one request to `endpoint` and wait for its reply.
fn exchange(endpoint: &ServerEndpoint, req: ComputationRequest) -> Result<u64, DispatchError> {
    let addrs = (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(|source| DispatchError::Resolve {
            endpoint: endpoint.clone(),
            source,
        })?
        .collect::<Vec<SocketAddr>>();
    if addrs.is_empty() {
        return Err(DispatchError::Unresolved(endpoint.clone()));
    }

    let stream = TcpStream::connect(&addrs[..]).map_err(|source| DispatchError::Connect {
        endpoint: endpoint.clone(),
        source,
    })?;

    let transport_err = |source: TransportError| DispatchError::Transport {
        endpoint: endpoint.clone(),
        source,
    };
    let mut transport = ProtocolTransport::new(stream);
    transport.write_request(req).map_err(transport_err)?;
    let reply = transport
        .read_reply()
        .map_err(transport_err)?
        .ok_or_else(|| DispatchError::ClosedByPeer(endpoint.clone()))?;

    Ok(reply.result)
}
