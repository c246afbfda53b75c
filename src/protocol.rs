//! Messages exchanged with a launched application.
//!
//! Each message is one JSON object per line, tagged by `"type"`:
//!
//! ```text
//!   {"type":"SET_APP_ID","app_id":"application_1_0001"}
//!   {"type":"SET_STATE","state":"RUNNING"}
//!   {"type":"STOP"}
//! ```
//!
//! `SET_APP_ID` and `SET_STATE` are reports from the application; `STOP` is
//! the only control message sent to it.

use serde::{Deserialize, Serialize};

use crate::error::LaunchResult;
use crate::state::{AppId, State};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Ask the application to shut down gracefully.
    Stop,
    /// The application learned its cluster identifier.
    SetAppId { app_id: AppId },
    /// The application changed state.
    SetState { state: State },
}

impl Message {
    /// Encode as a single newline-terminated JSON line.
    pub fn to_json_line(&self) -> LaunchResult<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn from_json_line(line: &str) -> LaunchResult<Self> {
        Ok(serde_json::from_str(line.trim_end())?)
    }
}
