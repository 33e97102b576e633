//! Guarded `std::net` routines.

use crate::guarded_fn;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs, UdpSocket};

guarded_fn! {
    owner = "std::net::TcpStream", name = "connect";
    /// Guarded [`TcpStream::connect`].
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<TcpStream> {
        TcpStream::connect(addr)
    }
}

/// Guarded [`TcpListener`] methods.
pub trait GuardedTcpListener {
    /// Guarded [`TcpListener::accept`].
    fn guarded_accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
}

impl GuardedTcpListener for TcpListener {
    guarded_fn! {
        owner = "std::net::TcpListener", name = "accept";
        fn guarded_accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
            self.accept()
        }
    }
}

/// Guarded [`UdpSocket`] methods.
pub trait GuardedUdpSocket {
    /// Guarded [`UdpSocket::recv_from`].
    fn guarded_recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Guarded [`UdpSocket::send_to`].
    fn guarded_send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize>;
}

impl GuardedUdpSocket for UdpSocket {
    guarded_fn! {
        owner = "std::net::UdpSocket", name = "recv_from";
        fn guarded_recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            self.recv_from(buf)
        }
    }

    guarded_fn! {
        owner = "std::net::UdpSocket", name = "send_to";
        fn guarded_send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
            self.send_to(buf, addr)
        }
    }
}
