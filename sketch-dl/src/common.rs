pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use futures::{
    stream::{self, Stream, StreamExt as _, TryStreamExt as _},
    AsyncBufReadExt as _, AsyncReadExt as _, AsyncWriteExt as _,
};
pub use indexmap::IndexSet;
pub use itertools::Itertools as _;
pub use log::{info, warn};
pub use once_cell::sync::Lazy;
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    fmt,
    fmt::Debug,
    future::Future,
    iter,
    ops::Index,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
    time::Instant,
};
