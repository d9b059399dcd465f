//! Lazy, exactly-once symbol loading for wired WebAssembly units.
//!
//! Independently deployable units declare the packages they export and import.
//! Once a module system has resolved those declarations into a wiring graph,
//! `wasm_lazy_link` takes over at runtime: the first time a unit asks for a
//! symbol, the symbol is located by walking the unit's wiring, its bytes are
//! fetched from the winning unit's content, passed through the registered
//! weaving hooks and compiled. The result is published once per name, even when
//! many threads race for it.
//!
//! # Core Concepts
//!
//! - [`UnitRevision`]: One immutable version of a unit, identified by a
//! 	[`RevisionId`] and carrying its packaged [`Content`].
//!
//! - [`Wiring`]: The resolved graph node of a revision. It lists the packages
//! 	delegated to the base runtime ([`BootDelegation`]), the fragments that
//! 	extend the revision's content, and the providers wired to satisfy its
//! 	imports and requires. Wirings are built bottom-up and never change.
//!
//! - [`Loader`]: The per-revision entry point. Owns the [`AccessorCache`] and the
//! 	load lock, and runs the weaving pipeline of its [`HookRegistry`].
//!
//! - [`Symbol`]: A defined symbol: its compiled [`Module`], and the
//! 	[`ContentSource`] that supplied its bytes.
//!
//! # Resolution Order
//!
//! A name is looked up, in order, in:
//! 1. the base runtime, if its package is boot-delegated
//! 2. the revision's own content, then each fragment's content
//! 3. the provider of an import wire for its package (authoritative)
//! 4. each provider of a require wire for its package, in order
//! 5. every wired provider, if the name starts with a configured generated-name prefix
//!
//! # Example
//!
//! ```
//! use std::sync::Arc ;
//! use wasm_lazy_link::{
//! 	Engine, Loader, MemoryContent, RevisionId, UnitRevision, Wiring,
//! 	HookError, HookRegistry, ContentSource, LockMode,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::default();
//!
//! // The provider exports the package `acme.math`.
//! let math = Arc::new( UnitRevision::new( RevisionId::new( 1 ), "acme.math", MemoryContent::new()
//! 	.with_entry( "acme/math/Adder.wasm", r#"(module (func (export "add")))"# ),
//! ));
//! let math_wiring = Wiring::builder( math ).build();
//!
//! // The consumer imports it.
//! let app = Arc::new( UnitRevision::new( RevisionId::new( 2 ), "acme.app", MemoryContent::new() ));
//! let app_wiring = Wiring::builder( app )
//! 	.import( "acme.math", math_wiring )
//! 	.build();
//!
//! // Hooks rewrite bytes before they are compiled.
//! let hooks = Arc::new( HookRegistry::new() );
//! hooks.register_hook(| _name: &str, _bytes: &mut Vec<u8> | -> Result<(), HookError> { Ok(()) });
//!
//! let loader = Loader::new( engine, app_wiring )
//! 	.with_hooks( hooks )
//! 	.with_lock_mode( LockMode::PerName );
//!
//! let adder = loader.load( "acme.math.Adder" )?;
//! assert!( matches!( adder.source(), ContentSource::Imported { .. }));
//! assert_eq!( adder.source().revision_id(), Some( RevisionId::new( 1 )));
//! assert!( adder.is_woven() );
//!
//! // Later requests are answered from the accessor cache.
//! assert!( Arc::ptr_eq( &adder, &loader.load( "acme.math.Adder" )? ));
//! # Ok(())
//! # }
//! ```
//!
//! # Re-exports
//!
//! `wasm_lazy_link` re-exports `Engine` and `Module` from `wasmtime`; see the
//! [wasmtime docs](https://docs.rs/wasmtime/latest/wasmtime/) for details.

mod accessor ;
mod load_lock ;
mod loader ;
mod locator ;
mod revision ;
mod weaving ;
mod wiring ;
mod woven ;

pub use wasmtime::{ Engine, Module };

pub use accessor::{ Accessor, AccessorCache };
pub use load_lock::{ LoadLock, LoadPermit, LockMode };
pub use loader::{ Loader, LoadError, Symbol };
pub use locator::{ ContentSource, entry_path, package_of };
pub use revision::{ Content, MemoryContent, RevisionId, UnitRevision };
pub use weaving::{ HookError, HookRegistry, WeavingHook, WovenListener };
pub use wiring::{ BootDelegation, Wire, WireKind, Wiring, WiringBuilder };
pub use woven::{ InvalidTransition, WovenState, WovenSymbol };
