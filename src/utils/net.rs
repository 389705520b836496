//! Listener setup for the HTTP server

use std::io;
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd};

use nix::sys::socket::{
    self, sockopt, AddressFamily, Backlog, SockFlag, SockProtocol, SockType, SockaddrIn,
    SockaddrIn6,
};

use crate::error::{AppError, Result};

/// Combine the configured bind address and port
pub fn resolve_bind_addr(address: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = address
        .trim_matches(|c| c == '[' || c == ']')
        .parse()
        .map_err(|_| AppError::Config(format!("invalid bind address '{}'", address)))?;
    Ok(SocketAddr::new(ip, port))
}

/// Bind a non-blocking TCP listener with `SO_REUSEADDR`, so a restarted
/// server does not wait out `TIME_WAIT` on the previous one's port.
/// IPv6 sockets are made v6-only.
pub fn bind_tcp_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let family = match addr {
        SocketAddr::V4(_) => AddressFamily::Inet,
        SocketAddr::V6(_) => AddressFamily::Inet6,
    };
    let fd = socket::socket(
        family,
        SockType::Stream,
        SockFlag::SOCK_CLOEXEC,
        SockProtocol::Tcp,
    )?;

    socket::setsockopt(&fd, sockopt::ReuseAddr, &true)?;

    match addr {
        SocketAddr::V4(v4) => socket::bind(fd.as_raw_fd(), &SockaddrIn::from(v4))?,
        SocketAddr::V6(v6) => {
            socket::setsockopt(&fd, sockopt::Ipv6V6Only, &true)?;
            socket::bind(fd.as_raw_fd(), &SockaddrIn6::from(v6))?;
        }
    }
    socket::listen(&fd, Backlog::MAXCONN)?;

    let listener = unsafe { TcpListener::from_raw_fd(fd.into_raw_fd()) };
    listener.set_nonblocking(true)?;
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_bind_addr() {
        assert_eq!(
            resolve_bind_addr("0.0.0.0", 5000).unwrap(),
            "0.0.0.0:5000".parse().unwrap()
        );
        assert_eq!(
            resolve_bind_addr("[::1]", 8080).unwrap(),
            "[::1]:8080".parse().unwrap()
        );
        assert!(matches!(
            resolve_bind_addr("camera.local", 5000),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let listener = bind_tcp_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let local = listener.local_addr().unwrap();
        assert!(local.ip().is_loopback());
        assert_ne!(local.port(), 0);
    }
}
