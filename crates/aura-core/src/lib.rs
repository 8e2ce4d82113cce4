pub mod builder;
pub mod catalogs;
pub mod dependency;
pub mod descriptor;
pub mod error;
pub mod flavor;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod source;
pub mod types;
pub mod validator;

pub use builder::{build, BuildContext, DefinitionResolver, EdgeKind};
pub use catalogs::ENGINE_VERSION;
pub use descriptor::{DefDescriptor, DefType, ReferenceKind};
pub use error::{DefinitionError, DescriptorParseError, SourceError};
pub use lexer::lex;
pub use parser::parse_string;
pub use resolver::{Registry, RegistryOptions};
pub use source::{MemorySourceProvider, Source, SourceProvider};
pub use types::*;
pub use validator::{instantiate, BalancedScriptValidator, ScriptValidator};
