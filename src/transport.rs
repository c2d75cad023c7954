//! Point-to-point links between nodes.
//!
//! A `Transport` sends an envelope to one named node and receives from one
//! named node. Receives block until that node's next message arrives; there
//! is no broadcast, no timeout and no retry.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, SieveError};
use crate::message::{self, Envelope, Tag};

/// Pause between attempts to reach the coordinator at startup
const CONNECT_BACKOFF: Duration = Duration::from_millis(250);

pub trait Transport {
    /// This node's identity, 0 is the coordinator
    fn rank(&self) -> usize;

    /// Number of nodes in the cluster
    fn size(&self) -> usize;

    fn send(&mut self, dest: usize, envelope: &Envelope) -> Result<()>;

    /// Block until the next message from `source` arrives; it must carry `tag`
    fn recv(&mut self, source: usize, tag: Tag) -> Result<Envelope>;
}

/// Reject envelopes of the wrong kind or from the wrong sender
fn check(envelope: Envelope, source: usize, tag: Tag) -> Result<Envelope> {
    if envelope.tag != tag || envelope.source != source {
        return Err(SieveError::UnexpectedMessage {
            expected: tag,
            actual: envelope.tag,
            peer: source,
            sender: envelope.source,
        });
    }
    Ok(envelope)
}

/// In-process endpoint of a fully connected mesh
///
/// Every ordered pair of nodes gets its own channel, so messages from one
/// source arrive in the order they were sent. Envelopes travel encoded, the
/// same bytes a network transport would carry.
pub struct LocalTransport {
    rank: usize,
    size: usize,
    /// Indexed by destination rank
    outboxes: Vec<Option<Sender<Vec<u8>>>>,
    /// Indexed by source rank
    inboxes: Vec<Option<Receiver<Vec<u8>>>>,
}

impl LocalTransport {
    /// One endpoint per rank, in rank order
    pub fn mesh(size: usize) -> Vec<LocalTransport> {
        let mut outboxes: Vec<Vec<Option<Sender<Vec<u8>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut inboxes: Vec<Vec<Option<Receiver<Vec<u8>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for src in 0..size {
            for dst in (0..size).filter(|&dst| dst != src) {
                let (tx, rx) = mpsc::channel();
                outboxes[src][dst] = Some(tx);
                inboxes[dst][src] = Some(rx);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| LocalTransport {
                rank,
                size,
                outboxes,
                inboxes,
            })
            .collect()
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&mut self, dest: usize, envelope: &Envelope) -> Result<()> {
        let outbox = self
            .outboxes
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or(SieveError::NoRoute {
                from: self.rank,
                dest,
            })?;

        // Same size bound as a stream frame
        let bytes = message::encode_frame(envelope)?;
        outbox
            .send(bytes)
            .map_err(|_| SieveError::Disconnected { peer: dest })
    }

    fn recv(&mut self, source: usize, tag: Tag) -> Result<Envelope> {
        let inbox = self
            .inboxes
            .get(source)
            .and_then(Option::as_ref)
            .ok_or(SieveError::NoRoute {
                from: source,
                dest: self.rank,
            })?;

        let bytes = inbox
            .recv()
            .map_err(|_| SieveError::Disconnected { peer: source })?;
        check(message::decode(&bytes)?, source, tag)
    }
}

/// Coordinator side of a TCP cluster before the other nodes have joined
pub struct CoordinatorListener {
    listener: TcpListener,
}

impl CoordinatorListener {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait until every other rank has connected and introduced itself
    pub fn accept(self, size: usize) -> Result<TcpTransport> {
        let mut peers: Vec<Option<TcpStream>> = (0..size).map(|_| None).collect();
        let addr = self.local_addr()?;
        info!(%addr, expected = size.saturating_sub(1), "waiting for nodes to join");

        let mut joined = 0;
        while joined + 1 < size {
            let (mut stream, peer_addr) = self.listener.accept()?;
            stream.set_nodelay(true)?;

            let hello = message::read_frame(&mut stream)?.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("{} closed before its handshake", peer_addr),
                )
            })?;
            if hello.tag != Tag::Handshake {
                return Err(SieveError::UnexpectedMessage {
                    expected: Tag::Handshake,
                    actual: hello.tag,
                    peer: hello.source,
                    sender: hello.source,
                });
            }

            let rank = hello.source;
            if rank == 0 || rank >= size {
                return Err(SieveError::RankOutOfRange { rank, nodes: size });
            }
            if peers[rank].is_some() {
                return Err(SieveError::DuplicateRank { rank });
            }

            info!(rank, %peer_addr, "node joined");
            peers[rank] = Some(stream);
            joined += 1;
        }

        Ok(TcpTransport {
            rank: 0,
            size,
            peers,
        })
    }
}

/// Star-shaped TCP cluster: every node holds one stream per peer it can
/// reach, which for non-coordinators is just the coordinator
pub struct TcpTransport {
    rank: usize,
    size: usize,
    /// Indexed by peer rank
    peers: Vec<Option<TcpStream>>,
}

impl TcpTransport {
    /// Join the cluster as `rank`
    ///
    /// Only establishing the connection is attempted more than once, since
    /// nodes may start before the coordinator listens.
    pub fn connect<A: ToSocketAddrs + Copy>(
        coordinator: A,
        rank: usize,
        size: usize,
        attempts: usize,
    ) -> Result<Self> {
        if rank == 0 || rank >= size {
            return Err(SieveError::RankOutOfRange { rank, nodes: size });
        }

        let mut last_err = None;
        for attempt in 1..=attempts.max(1) {
            match TcpStream::connect(coordinator) {
                Ok(mut stream) => {
                    stream.set_nodelay(true)?;
                    message::write_frame(&mut stream, &Envelope::hello(rank))?;
                    debug!(rank, attempt, "connected to coordinator");

                    let mut peers: Vec<Option<TcpStream>> = (0..size).map(|_| None).collect();
                    peers[0] = Some(stream);
                    return Ok(Self { rank, size, peers });
                }
                Err(e) => {
                    warn!(rank, attempt, error = %e, "coordinator not reachable");
                    last_err = Some(e);
                    thread::sleep(CONNECT_BACKOFF);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no connection attempt"))
            .into())
    }
}

impl Transport for TcpTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&mut self, dest: usize, envelope: &Envelope) -> Result<()> {
        let stream = self
            .peers
            .get_mut(dest)
            .and_then(Option::as_mut)
            .ok_or(SieveError::NoRoute {
                from: self.rank,
                dest,
            })?;
        message::write_frame(stream, envelope)
    }

    fn recv(&mut self, source: usize, tag: Tag) -> Result<Envelope> {
        let rank = self.rank;
        let stream = self
            .peers
            .get_mut(source)
            .and_then(Option::as_mut)
            .ok_or(SieveError::NoRoute {
                from: source,
                dest: rank,
            })?;

        let envelope =
            message::read_frame(stream)?.ok_or(SieveError::Disconnected { peer: source })?;
        check(envelope, source, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Payload;
    use crate::result::PartialResult;

    #[test]
    fn test_local_mesh_delivers_per_source() {
        let mut mesh = LocalTransport::mesh(3);
        let mut two = mesh.pop().unwrap();
        let mut one = mesh.pop().unwrap();
        let mut zero = mesh.pop().unwrap();
        assert_eq!((zero.rank(), one.rank(), two.rank()), (0, 1, 2));
        assert_eq!(zero.size(), 3);

        two.send(0, &Envelope::result(2, PartialResult::counted(20))).unwrap();
        one.send(0, &Envelope::result(1, PartialResult::counted(10))).unwrap();

        // Receiving is per source, arrival order does not matter
        let first = zero.recv(1, Tag::Result).unwrap();
        let second = zero.recv(2, Tag::Result).unwrap();
        assert_eq!(first.payload, Payload::Count(10));
        assert_eq!(second.payload, Payload::Count(20));
    }

    #[test]
    fn test_local_ordered_per_source() {
        let mut mesh = LocalTransport::mesh(2);
        let mut one = mesh.pop().unwrap();
        let mut zero = mesh.pop().unwrap();

        one.send(0, &Envelope::hello(1)).unwrap();
        one.send(0, &Envelope::result(1, PartialResult::counted(5))).unwrap();

        assert_eq!(zero.recv(1, Tag::Handshake).unwrap(), Envelope::hello(1));
        assert_eq!(
            zero.recv(1, Tag::Result).unwrap().into_partial(),
            Some(PartialResult::counted(5))
        );
    }

    #[test]
    fn test_local_wrong_tag() {
        let mut mesh = LocalTransport::mesh(2);
        let mut one = mesh.pop().unwrap();
        let mut zero = mesh.pop().unwrap();

        one.send(0, &Envelope::hello(1)).unwrap();
        let err = zero.recv(1, Tag::Result).unwrap_err();
        assert!(matches!(
            err,
            SieveError::UnexpectedMessage {
                expected: Tag::Result,
                actual: Tag::Handshake,
                ..
            }
        ));
    }

    #[test]
    fn test_local_dropped_peer_disconnects() {
        let mut mesh = LocalTransport::mesh(2);
        drop(mesh.pop());
        let mut zero = mesh.pop().unwrap();

        let err = zero.recv(1, Tag::Result).unwrap_err();
        assert!(matches!(err, SieveError::Disconnected { peer: 1 }));
    }

    #[test]
    fn test_local_no_route_to_self() {
        let mut mesh = LocalTransport::mesh(2);
        let err = mesh[0].send(0, &Envelope::hello(0)).unwrap_err();
        assert!(matches!(err, SieveError::NoRoute { from: 0, dest: 0 }));
        let err = mesh[0].send(7, &Envelope::hello(0)).unwrap_err();
        assert!(matches!(err, SieveError::NoRoute { from: 0, dest: 7 }));
    }

    #[test]
    fn test_tcp_star_round_trip() {
        let listener = CoordinatorListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let peers: Vec<_> = (1..3)
            .map(|rank| {
                thread::spawn(move || {
                    let mut transport = TcpTransport::connect(addr, rank, 3, 5).unwrap();
                    let partial = PartialResult::enumerated(vec![rank as u64 * 100 + 1]);
                    transport
                        .send(0, &Envelope::result(rank, partial))
                        .unwrap();
                })
            })
            .collect();

        let mut coordinator = listener.accept(3).unwrap();
        assert_eq!(coordinator.rank(), 0);
        for rank in [2, 1] {
            let envelope = coordinator.recv(rank, Tag::Result).unwrap();
            assert_eq!(envelope.source, rank);
            assert_eq!(
                envelope.payload,
                Payload::Primes(vec![rank as u64 * 100 + 1])
            );
        }

        for peer in peers {
            peer.join().unwrap();
        }
    }

    #[test]
    fn test_tcp_rejects_bad_rank() {
        let listener = CoordinatorListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        assert!(matches!(
            TcpTransport::connect(addr, 0, 2, 1),
            Err(SieveError::RankOutOfRange { rank: 0, nodes: 2 })
        ));
        assert!(matches!(
            TcpTransport::connect(addr, 2, 2, 1),
            Err(SieveError::RankOutOfRange { rank: 2, nodes: 2 })
        ));
    }

    #[test]
    fn test_tcp_peer_closing_early_disconnects() {
        let listener = CoordinatorListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let peer = thread::spawn(move || {
            let transport = TcpTransport::connect(addr, 1, 2, 5).unwrap();
            drop(transport);
        });

        let mut coordinator = listener.accept(2).unwrap();
        peer.join().unwrap();
        let err = coordinator.recv(1, Tag::Result).unwrap_err();
        assert!(matches!(err, SieveError::Disconnected { peer: 1 }));
    }
}
