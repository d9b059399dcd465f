use std::sync::Arc ;
use thiserror::Error ;
use tracing::{ debug, trace };
use wasmtime::{ Engine, Module };

use crate::accessor::{ Accessor, AccessorCache };
use crate::load_lock::{ LoadLock, LockMode };
use crate::locator::{ entry_path, ContentSource, FailedDelegations, Locator, Memo };
use crate::revision::Content ;
use crate::weaving::{ self, HookError, HookRegistry };
use crate::wiring::Wiring ;



/// Why a symbol could not be loaded.
///
/// Cloneable so that one failed attempt can be handed to every caller that was
/// queued behind it.
#[derive( Debug, Clone, Error )]
pub enum LoadError {
	/// No content source reachable from the wiring holds the symbol. This
	/// answer is cached and never re-examined.
	#[error( "Symbol Not Found: {0}" )] NotFound( String ),
	/// A weaving hook rejected the symbol's bytes.
	#[error( "Transform Failed for {name}: {reason}" )]
	TransformFailed { name: String, reason: Arc<HookError> },
	/// The (possibly woven) bytes did not compile into a module.
	#[error( "Define Failed for {name}: {reason}" )]
	DefineFailed { name: String, reason: Arc<wasmtime::Error> },
	/// The symbol was requested again, on the same thread, while it was being
	/// loaded; typically by a weaving hook loading the symbol it is weaving.
	#[error( "Circular Load: {0}" )] Circular( String ),
}

impl LoadError {
	/// The name of the symbol that failed to load.
	pub fn name( &self ) -> &str {
		match self {
			Self::NotFound( name )
			| Self::Circular( name )
			| Self::TransformFailed { name, .. }
			| Self::DefineFailed { name, .. } => name,
		}
	}
}

/// A defined symbol.
pub struct Symbol {
	name: String,
	source: ContentSource,
	module: Module,
	woven: bool,
}

impl Symbol {
	#[inline] pub fn name( &self ) -> &str { &self.name }
	/// Where the symbol's bytes came from, as seen from the loading unit.
	#[inline] pub fn source( &self ) -> &ContentSource { &self.source }
	/// The compiled module.
	#[inline] pub fn module( &self ) -> &Module { &self.module }
	/// Whether the bytes went through at least one weaving hook.
	#[inline] pub fn is_woven( &self ) -> bool { self.woven }
}

impl std::fmt::Debug for Symbol {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Symbol" )
			.field( "name", &self.name )
			.field( "source", &self.source )
			.field( "woven", &self.woven )
			.finish_non_exhaustive()
	}
}

/// Loads the symbols visible to one unit revision.
///
/// A loader owns the accessor cache and the load lock of its revision; both
/// live exactly as long as the loader. Every symbol is loaded at most once:
/// concurrent requests for the same name wait for the first one and receive
/// its result.
///
/// ```
/// # use std::sync::Arc ;
/// # use wasm_lazy_link::{ Engine, Loader, MemoryContent, RevisionId, UnitRevision, Wiring };
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let content = MemoryContent::new()
/// 	.with_entry( "acme/math/Adder.wasm", r#"(module (func (export "add")))"# );
/// let revision = Arc::new( UnitRevision::new( RevisionId::new( 1 ), "acme.math", content ));
/// let loader = Loader::new( Engine::default(), Wiring::builder( revision ).build() );
///
/// let adder = loader.load( "acme.math.Adder" )?;
/// assert!( adder.module().exports().any(| export | export.name() == "add" ));
/// assert!( loader.load( "acme.math.Missing" ).is_err() );
/// # Ok(())
/// # }
/// ```
pub struct Loader {
	engine: Engine,
	wiring: Arc<Wiring>,
	base: Option<Arc<dyn Content>>,
	hooks: Arc<HookRegistry>,
	generated_prefixes: Vec<String>,
	entry_suffix: String,
	delegation_memo: bool,
	accessors: AccessorCache,
	lock: LoadLock,
	failed_delegations: FailedDelegations,
}

impl Loader {

	/// Default entry path suffix appended to a symbol's path.
	pub const DEFAULT_ENTRY_SUFFIX: &'static str = ".wasm" ;

	/// Creates a loader for the revision described by `wiring`.
	pub fn new( engine: Engine, wiring: Arc<Wiring> ) -> Self {
		Self {
			engine,
			wiring,
			base: None,
			hooks: Arc::new( HookRegistry::new() ),
			generated_prefixes: Vec::with_capacity( 0 ),
			entry_suffix: Self::DEFAULT_ENTRY_SUFFIX.to_string(),
			delegation_memo: true,
			accessors: AccessorCache::new(),
			lock: LoadLock::new( LockMode::default() ),
			failed_delegations: FailedDelegations::default(),
		}
	}

	/// Serializes loads per name (default) or per unit.
	pub fn with_lock_mode( mut self, mode: LockMode ) -> Self {
		self.lock = LoadLock::new( mode );
		self
	}

	/// Content of the base runtime that boot-delegated packages resolve against.
	pub fn with_base_runtime( mut self, base: Arc<dyn Content> ) -> Self {
		self.base = Some( base );
		self
	}

	/// Weaving hooks and listeners. Several loaders may share one registry.
	pub fn with_hooks( mut self, hooks: Arc<HookRegistry> ) -> Self {
		self.hooks = hooks ;
		self
	}

	/// Name prefixes of runtime-generated symbols whose package says nothing
	/// about where they live. Such names are searched through every wire.
	pub fn with_generated_prefixes( mut self, prefixes: impl IntoIterator<Item = impl Into<String>> ) -> Self {
		self.generated_prefixes = prefixes.into_iter().map( Into::into ).collect();
		self
	}

	/// Suffix appended to a symbol's path to form its content entry path.
	pub fn with_entry_suffix( mut self, suffix: impl Into<String> ) -> Self {
		self.entry_suffix = suffix.into();
		self
	}

	/// Whether a name the base runtime failed to supply once is offered to it
	/// again. With the memo enabled (the default) it goes straight to unit
	/// content; other names of the same package are still delegated.
	pub fn with_delegation_memo( mut self, enabled: bool ) -> Self {
		self.delegation_memo = enabled ;
		self
	}

	#[inline] pub fn wiring( &self ) -> &Arc<Wiring> { &self.wiring }
	#[inline] pub fn hooks( &self ) -> &Arc<HookRegistry> { &self.hooks }
	#[inline] pub fn lock_mode( &self ) -> LockMode { self.lock.mode() }

	/// Loads `name`, resolving, weaving and defining it on first use.
	///
	/// # Errors
	/// - [`LoadError::NotFound`] if no reachable source holds the symbol.
	/// - [`LoadError::TransformFailed`] if a weaving hook rejected it.
	/// - [`LoadError::DefineFailed`] if its bytes did not compile.
	/// - [`LoadError::Circular`] if the calling thread is already loading `name`.
	///
	/// Only `NotFound` is remembered; other failures are retried by the next
	/// request that was not already queued behind the failing attempt.
	pub fn load( &self, name: &str ) -> Result<Arc<Symbol>, LoadError> {

		if let Some( accessor ) = self.accessors.get( name ) {
			trace!( symbol = name, "accessor cache hit" );
			return answer( name, accessor );
		}

		let mut permit = self.lock.acquire( name )?;
		if let Some( error ) = permit.take_shared_failure() {
			debug!( symbol = name, %error, "failed while queued behind another attempt" );
			return Err( error );
		}

		// another caller may have finished while this one was queued
		if let Some( accessor ) = self.accessors.get( name ) {
			trace!( symbol = name, "accessor cache hit after waiting" );
			return answer( name, accessor );
		}

		let result = self.resolve( name );
		if let Err( error ) = &result {
			if !matches!( error, LoadError::NotFound( _ )) { permit.fail( error ); }
		}
		result

	}

	/// Finds the source of `name` without loading, caching or remembering
	/// anything.
	pub fn locate( &self, name: &str ) -> Option<ContentSource> {
		let memo = match self.delegation_memo {
			true => Memo::Read( &self.failed_delegations ),
			false => Memo::Off,
		};
		self.locate_entry( name, &entry_path( name, &self.entry_suffix ), memo )
	}

	/// The memoized result for `name`, if it was loaded or found missing.
	pub fn cached( &self, name: &str ) -> Option<Accessor> { self.accessors.get( name ) }

	/// Number of callers queued behind the in-flight load of `name`.
	pub fn waiting( &self, name: &str ) -> usize { self.lock.waiting( name ) }

	/// Number of live load lock handles.
	pub fn lock_handles( &self ) -> usize { self.lock.handles() }

	fn locate_entry( &self, name: &str, path: &str, memo: Memo<'_> ) -> Option<ContentSource> {
		Locator {
			base: self.base.as_deref(),
			memo,
			generated_prefixes: &self.generated_prefixes,
		}.locate( &self.wiring, name, path )
	}

	fn resolve( &self, name: &str ) -> Result<Arc<Symbol>, LoadError> {

		let path = entry_path( name, &self.entry_suffix );
		let memo = match self.delegation_memo {
			true => Memo::Update( &self.failed_delegations ),
			false => Memo::Off,
		};
		let Some( source ) = self.locate_entry( name, &path, memo ) else { return self.not_found( name ) };
		let Some( raw ) = source.fetch_bytes( self.base.as_deref(), &path ) else { return self.not_found( name ) };
		debug!( symbol = name, %source, "located" );

		let ( module, woven ) = match source.is_base() {
			true => ( weaving::define( &self.engine, name, &raw )?, false ),
			false => self.hooks.weave( &self.engine, name, raw )?,
		};

		let symbol = Arc::new( Symbol { name: name.to_string(), source, module, woven });
		answer( name, self.accessors.put( name, Accessor::Resolved( symbol )))

	}

	fn not_found( &self, name: &str ) -> Result<Arc<Symbol>, LoadError> {
		debug!( symbol = name, unit = %self.wiring.revision().id(), "not found" );
		answer( name, self.accessors.put( name, Accessor::NotFound ))
	}

}

impl std::fmt::Debug for Loader {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Loader" )
			.field( "revision", &self.wiring.revision().id() )
			.field( "lock", &self.lock )
			.field( "hooks", &self.hooks )
			.field( "cached", &self.accessors.len() )
			.finish_non_exhaustive()
	}
}

fn answer( name: &str, accessor: Accessor ) -> Result<Arc<Symbol>, LoadError> {
	match accessor {
		Accessor::Resolved( symbol ) => Ok( symbol ),
		Accessor::NotFound => Err( LoadError::NotFound( name.to_string() )),
	}
}
