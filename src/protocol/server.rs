use std::{
    io::{self, Read, Write},
    net::{Shutdown, SocketAddr, TcpListener, TcpStream},
    num::NonZeroUsize,
};

use log::{debug, info, warn};
use thiserror::Error;

use crate::pool::{PoolError, WorkerPool};

use super::{
    ProtocolTransport,
    thread::{ThreadPool, ThreadPoolError},
    transport::TransportError,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Handlers(#[from] ThreadPoolError),
}

/// Why a connection ended other than by the peer closing between requests.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("request aborted: {0}")]
    Aborted(#[from] PoolError),
}

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// Address to listen on.
    pub address: SocketAddr,
    /// Worker threads used for every request.
    pub workers: NonZeroUsize,
    /// Connections served at the same time.
    pub connections: NonZeroUsize,
}

pub struct FactorialServer {
    listener: TcpListener,
    workers: WorkerPool,
    pool: ThreadPool,
}

impl FactorialServer {
    /// Bind the listening socket and start the connection handlers.
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.address)?;
        Ok(Self {
            listener,
            workers: WorkerPool::new(config.workers),
            pool: ThreadPool::new(config.connections)?,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, handing each one to a free connection handler.
    pub fn listen(self) -> Result<(), ServerError> {
        info!(
            "listening at {} with {} worker(s) per request, {} connection handler(s)",
            self.local_addr()?,
            self.workers.workers(),
            self.pool.size()
        );

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let workers = self.workers;
                    self.pool.execute(move || serve_peer(stream, workers))?;
                }
                Err(e) => warn!("broken connection: {e:?}"),
            }
        }
        Ok(())
    }
}

fn serve_peer(stream: TcpStream, workers: WorkerPool) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown peer".to_string());
    info!("accepted connection from {peer}");

    match handle_connection(&stream, workers) {
        Ok(()) => info!("{peer} closed the connection"),
        Err(e) => warn!("closing connection to {peer}: {e}"),
    }

    if let Err(e) = stream.shutdown(Shutdown::Both) {
        debug!("shutdown of {peer} failed: {e}");
    }
}

/// Serve requests on one connection until the peer closes it.
///
/// Returns `Ok` when the peer closes between requests. A truncated request, an invalid
/// request or a failed computation ends the session with an error and no reply.
fn handle_connection<T: Read + Write>(stream: T, workers: WorkerPool) -> Result<(), SessionError> {
    let mut transport = ProtocolTransport::new(stream);

    while let Some(req) = transport.read_request()? {
        debug!("received: {} {} {}", req.begin, req.end, req.modulus);

        let reply = workers.compute(&req)?;
        info!(
            "total for {} to {} mod {}: {}",
            req.begin, req.end, req.modulus, reply.result
        );

        transport.write_reply(reply)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        io::Cursor,
        net::{Ipv4Addr, SocketAddrV4},
        thread,
    };

    use crate::{
        arith::factorial,
        partition::PartitionError,
        protocol::{ComputationReply, ComputationRequest, REPLY_SIZE},
    };

    use super::*;

    /// Reads from a canned buffer, records everything written.
    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Duplex {
        fn new(requests: &[ComputationRequest]) -> Self {
            let mut encoder = ProtocolTransport::new(Cursor::new(Vec::new()));
            for req in requests {
                encoder.write_request(*req).unwrap();
            }
            let input = encoder.into_inner().into_inner();
            Self {
                input: Cursor::new(input),
                output: Vec::new(),
            }
        }

        fn replies(self) -> Vec<u64> {
            let mut decoder = ProtocolTransport::new(Cursor::new(self.output));
            let mut out = Vec::new();
            while let Some(reply) = decoder.read_reply().unwrap() {
                out.push(reply.result);
            }
            out
        }
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn workers(n: usize) -> WorkerPool {
        WorkerPool::new(NonZeroUsize::new(n).unwrap())
    }

    fn request(begin: u64, end: u64, modulus: u64) -> ComputationRequest {
        ComputationRequest {
            begin,
            end,
            modulus,
        }
    }

    #[test]
    fn close_after_reply_is_orderly() {
        let mut stream = Duplex::new(&[request(1, 10, 1000)]);

        handle_connection(&mut stream, workers(3)).unwrap();
        assert_eq!(stream.replies(), vec![800]);
    }

    #[test]
    fn several_requests_per_connection() {
        let mut stream = Duplex::new(&[request(1, 10, 1000), request(1, 20, 97), request(1, 1, 7)]);

        handle_connection(&mut stream, workers(1)).unwrap();
        assert_eq!(stream.replies(), vec![800, factorial(1, 20, 97), 1]);
    }

    #[test]
    fn truncated_request_ends_session() {
        let mut stream = Duplex::new(&[request(1, 10, 1000)]);
        stream.input.get_mut().extend_from_slice(&[1, 2, 3]);

        let err = handle_connection(&mut stream, workers(2)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Transport(TransportError::ProtocolViolation { received: 3, .. })
        ));
        // The complete request before the garbage was still answered.
        assert_eq!(stream.replies(), vec![800]);
    }

    #[test]
    fn too_many_workers_aborts_without_reply() {
        let mut stream = Duplex::new(&[request(1, 3, 7), request(1, 10, 1000)]);

        let err = handle_connection(&mut stream, workers(5)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Aborted(PoolError::Partition(PartitionError::InvalidPartition { .. }))
        ));
        assert!(stream.output.is_empty());
    }

    #[test]
    fn invalid_request_aborts_without_reply() {
        let mut stream = Duplex::new(&[request(4, 2, 1000)]);

        assert!(handle_connection(&mut stream, workers(1)).is_err());
        assert!(stream.output.is_empty());
    }

    fn spawn_server(workers: usize, connections: usize) -> SocketAddr {
        let server = FactorialServer::bind(ServerConfig {
            address: SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0).into(),
            workers: NonZeroUsize::new(workers).unwrap(),
            connections: NonZeroUsize::new(connections).unwrap(),
        })
        .unwrap();
        let addr = server.local_addr().unwrap();
        thread::spawn(move || server.listen());
        addr
    }

    #[test]
    fn serves_over_tcp() {
        let addr = spawn_server(4, 1);
        let mut transport = ProtocolTransport::new(TcpStream::connect(addr).unwrap());

        transport.write_request(request(1, 20, 97)).unwrap();
        assert_eq!(
            transport.read_reply().unwrap(),
            Some(ComputationReply {
                result: factorial(1, 20, 97)
            })
        );
    }

    #[test]
    fn keeps_serving_after_a_bad_connection() {
        let addr = spawn_server(2, 1);

        let mut bad = TcpStream::connect(addr).unwrap();
        bad.write_all(&[0u8; 5]).unwrap();
        bad.shutdown(Shutdown::Write).unwrap();
        let mut rest = Vec::new();
        bad.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());

        let mut good = ProtocolTransport::new(TcpStream::connect(addr).unwrap());
        good.write_request(request(1, 10, 1000)).unwrap();
        assert_eq!(good.read_reply().unwrap().map(|r| r.result), Some(800));
    }

    #[test]
    fn serves_clients_concurrently() {
        let addr = spawn_server(2, 2);

        // Held open and idle; a sequential server would never get past it.
        let _idle = TcpStream::connect(addr).unwrap();

        let mut busy = ProtocolTransport::new(TcpStream::connect(addr).unwrap());
        busy.write_request(request(1, 10, 1000)).unwrap();
        let reply = busy.read_reply().unwrap();
        assert_eq!(reply.map(|r| r.result), Some(800));
    }

    #[test]
    fn aborted_request_closes_connection() {
        let addr = spawn_server(8, 1);
        let mut stream = TcpStream::connect(addr).unwrap();

        let mut transport = ProtocolTransport::new(&mut stream);
        transport.write_request(request(1, 3, 7)).unwrap();
        assert_eq!(transport.read_reply().unwrap(), None);

        let mut buf = [0u8; REPLY_SIZE];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }
}
