// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # conduit-rest
//!
//! REST platform driver for conduit.
//!
//! Sends one HTTP request per resource fetch against a validated base
//! endpoint. Authentication is applied as a single header:
//!
//! | `auth.type` | Header                              |
//! |-------------|-------------------------------------|
//! | `none`      | -                                   |
//! | `api_key`   | `X-API-Key: <key>`                  |
//! | `bearer`    | `Authorization: Bearer <token>`     |
//! | `basic`     | `Authorization: Basic <b64(u:p)>`   |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod driver;
pub mod request;
pub mod response;

pub use driver::{RestDriver, RestDriverFactory};
