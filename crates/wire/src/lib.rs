// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ck-wire: JSON-RPC-style wire protocol for the container tooling
//! request server.
//!
//! Wire format: newline-delimited JSON over the stdio transport.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod framing;
mod request;
mod response;
mod tool_schema;

pub use framing::{read_message, write_message, ProtocolError};
pub use request::{
    ClientInfo, InitializeParams, Request, RequestId, ToolsCallParams, METHOD_INITIALIZE,
    METHOD_INITIALIZED, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
pub use response::{
    ErrorData, Response, ResponseError, CODE_APPLICATION_ERROR, CODE_INVALID_PARAMS,
    CODE_METHOD_NOT_FOUND,
};
pub use tool_schema::{validate_descriptor, validate_input_schema, SchemaError, ToolDescriptor, MAX_SCHEMA_BYTES};
