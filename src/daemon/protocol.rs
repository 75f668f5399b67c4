//! Wire protocol: one JSON request line in, one JSON response line out.

use serde::{Deserialize, Serialize};

/// Request from a client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum Request {
    /// Execute a GraphQL document
    #[serde(rename = "graphql")]
    Graphql {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variables: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operation_name: Option<String>,
    },

    /// Check if the server is alive
    #[serde(rename = "ping")]
    Ping,

    /// Shutdown the server
    #[serde(rename = "shutdown")]
    Shutdown,
}

impl Request {
    pub fn graphql(query: impl Into<String>) -> Self {
        Request::Graphql {
            query: query.into(),
            variables: None,
            operation_name: None,
        }
    }
}

/// Response from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Response {
    /// Successful response with JSON data
    #[serde(rename = "ok")]
    Ok { data: serde_json::Value },

    /// Error response
    #[serde(rename = "error")]
    Error { message: String },

    /// Pong response (server is alive)
    #[serde(rename = "pong")]
    Pong,

    /// Shutdown acknowledgment
    #[serde(rename = "goodbye")]
    Goodbye,
}

impl Response {
    pub fn ok<T: Serialize>(data: T) -> Self {
        Response::Ok {
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Response::Error { message: msg.into() }
    }
}
