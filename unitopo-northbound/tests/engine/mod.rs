//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod composite;
mod concurrency;
mod read;
mod rollback;
mod write;
