// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod forms;
pub mod ids;
pub mod list;
pub mod model;
pub mod notify;
pub mod request;
pub mod session;
pub mod state;

pub use forms::*;
pub use ids::*;
pub use list::*;
pub use model::*;
pub use notify::*;
pub use request::*;
pub use session::*;
pub use state::*;
