//! CLI utilities for the binary
//!
//! Handles argument parsing and endpoint validation so the connection core
//! only ever receives a well-formed address.

/// Usage string printed on argument errors
pub const USAGE: &str = "usage: wstalk <endpoint>\n  endpoint  the ws:// or wss:// uri of the websocket endpoint";

/// Parse command line arguments for the binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Parse and validate the positional endpoint argument
///
/// Expects exactly one argument carrying a `ws://` or `wss://` uri.
/// Malformed input is rejected here, before the client is constructed.
pub fn parse_endpoint(args: &[String]) -> Result<String, String> {
    let [endpoint] = args else {
        return Err(format!("expected exactly one argument\n{USAGE}"));
    };

    if !endpoint.starts_with("ws://") && !endpoint.starts_with("wss://") {
        return Err(format!(
            "invalid uri {endpoint:?}: expected a ws:// or wss:// scheme\n{USAGE}"
        ));
    }

    Ok(endpoint.clone())
}
