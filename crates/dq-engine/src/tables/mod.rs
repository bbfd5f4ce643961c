//! Rule tables of the supported workflows
//!
//! Each submodule holds the static data of one workflow: selection axes,
//! switch ownership, dependency rules and, for skimming workflows, the
//! artifact lookup.

pub mod table_maker_mc;
pub mod table_reader;
