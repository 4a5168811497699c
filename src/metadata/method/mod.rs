//! Method bodies: headers, exception clauses and attribute flags.

mod body;
mod exceptions;
mod types;

pub use body::MethodBody;
pub use exceptions::{ExceptionHandler, ExceptionHandlerFlags};
pub use types::{
    FieldAttributes, MethodAttributes, MethodBodyFlags, MethodImplAttributes, SectionFlags,
};
