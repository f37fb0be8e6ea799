/*!

Types/type aliases that abstract over the implementing backing type.

A motivating example is the `IString` type, an interned string type. A number of external crates
could provide this functionality. This module redirects to whichever implementation we choose. To
use the [`ustr` crate](https://crates.io/crates/ustr), we just define `IString` as an alias for
`ustr::Ustr`:

```ignore
pub use ustr::Ustr as IString;
```

Interned strings compare and hash in O(1), which the reasoner relies on everywhere it keys terms
by canonical name.

For infrastructure with very different possible backing implementations we define an abstraction
layer instead. The `log` module could use any of a number of logging frameworks for its
implementation, but its public interface consists only of
`set_global_logging_threshold()`/`get_global_logging_threshold()` and the macros `error!`,
`warning!`, `info!`, `debug!`, and `trace!`. The backing implementation (currently `tracing`) is
encapsulated in the `log` module.

*/

mod string_util;

pub mod log;

// Interned string. `Ustr` interns into a process-wide cache, so equality and hashing are
// pointer-sized comparisons.
pub use ustr::Ustr as IString;

// For vectors that are expected to have few elements.
pub use smallvec::{smallvec, SmallVec};

// Re-exported so downstream crates don't need a direct dependency just to name the backend.
pub use tracing;

// Join sequences with a separator
pub use string_util::{join_iter, join_string};
