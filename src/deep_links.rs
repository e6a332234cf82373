//! Deep-link targets embedded in widget faces.
//!
//! The rendering layer turns taps into these URLs; the host app routes them.

use url::Url;

pub const DEEP_LINK_SCHEME: &str = "esimapp";

/// Dashboard root.
pub const DASHBOARD_URL: &str = "esimapp://dashboard";

/// Browse plans root (shown when there are no active lines).
pub const BROWSE_URL: &str = "esimapp://browse";

const ESIM_ROOT_URL: &str = "esimapp://esim";
const TOP_UP_SEGMENT: &str = "topup";

/// Detail screen for one subscription: `esimapp://esim/{id}`.
pub fn esim_detail_url(id: &str) -> String {
    esim_url(&[id])
}

/// Top-up flow for one subscription: `esimapp://esim/{id}/topup`.
pub fn esim_top_up_url(id: &str) -> String {
    esim_url(&[id, TOP_UP_SEGMENT])
}

fn esim_url(segments: &[&str]) -> String {
    let mut url = match Url::parse(ESIM_ROOT_URL) {
        Ok(url) => url,
        Err(_) => return ESIM_ROOT_URL.to_string(),
    };
    if let Ok(mut path) = url.path_segments_mut() {
        // Segments are percent-encoded, so an id can't escape its slot.
        path.extend(segments);
    }
    url.to_string()
}
