//! Control plane: line-in / JSON-out command protocol over a local unix
//! socket. Unix-only; on other platforms the supervisor runs without a
//! control surface.

mod protocol;
mod socket;

pub(crate) use socket::ControlSocket;
