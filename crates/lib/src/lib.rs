//! iospack-lib: incremental packaging of prebuilt iOS players.
//!
//! The pipeline turns a prebuilt player package and its trampoline Xcode
//! project into a buildable project, and then into an app:
//! - `pipeline`: ordered build steps that declare work on an action graph
//! - `action` / `execute`: declared file actions and their incremental executor
//! - `project`: reader and writer for `project.pbxproj`
//! - `relink`: static to dynamic library relinking with toolchain discovery
//! - `deploy`: rule-based copying of directory trees
//! - `device`: installing and launching the built app

pub mod action;
pub mod codegen;
pub mod config;
pub mod consts;
pub mod deploy;
pub mod device;
pub mod execute;
pub mod pipeline;
pub mod platform;
pub mod plist;
pub mod project;
pub mod relink;
pub mod util;
