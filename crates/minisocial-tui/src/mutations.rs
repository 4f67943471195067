//! Cross-slice state mutations.
//!
//! Feature handlers and overlays return these to request changes outside
//! their own slice. The main reducer applies them in order.

use minisocial_core::routes::Route;

use crate::features::banner::BannerKind;

#[derive(Debug, Clone, PartialEq)]
pub enum StateMutation {
    /// Push a route onto the navigation history.
    Navigate(Route),
    /// Pop the navigation history.
    Back,
    ShowBanner { kind: BannerKind, message: String },
}

impl StateMutation {
    pub fn success(message: impl Into<String>) -> Self {
        StateMutation::ShowBanner {
            kind: BannerKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StateMutation::ShowBanner {
            kind: BannerKind::Error,
            message: message.into(),
        }
    }
}
