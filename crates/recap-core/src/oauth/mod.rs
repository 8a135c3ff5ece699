//! Google OAuth for the upload channels
//!
//! Implements the installed-application flow: a PKCE-protected consent URL,
//! a loopback listener that catches the redirect, and the token endpoint
//! calls for the code exchange and later refreshes.

pub mod authorize;
pub mod client;
pub mod flow;
pub mod loopback;
pub mod pkce;

pub use authorize::authorization_url;
pub use client::TokenClient;
pub use flow::{InstalledAppFlow, PendingAuthorization};
pub use loopback::LoopbackReceiver;
pub use pkce::Pkce;
