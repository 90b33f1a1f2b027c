pub mod declaration;
pub mod error;
pub mod source;

pub use declaration::{Declaration, DeclarationKind, DocComment, Parameter, Signature};
pub use error::{DocsmithError, ErrorCategory, ErrorClassifier, LlmError, Result};
pub use source::{LineEnding, LineIndex, LineRange, SourceFile, indentation_at, relative_path};
