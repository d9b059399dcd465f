//! Byte transformation hooks and the pipeline that runs them.
//!
//! Every symbol loaded from unit content passes through the hooks registered
//! with the loader's [`HookRegistry`] before it is compiled. Hooks run in
//! registration order, each seeing the output of the previous one. Listeners
//! are told, synchronously and in registration order, whenever an attempt
//! reaches an observable [`WovenState`].
//!
//! When no hook is registered the raw bytes are compiled as they are and no
//! listener is notified.
//!
//! # Example
//!
//! ```
//! use wasm_lazy_link::{ HookError, HookRegistry, WovenState };
//!
//! let hooks = HookRegistry::new();
//! hooks.register_hook(| name: &str, bytes: &mut Vec<u8> | -> Result<(), HookError> {
//! 	if name.starts_with( "forbidden." ) { return Err( "forbidden package".into() ) }
//! 	if bytes.is_empty() { return Err( format!( "{} has no content", name ).into() ) }
//! 	Ok(())
//! });
//! hooks.register_listener(| name: &str, state: WovenState | {
//! 	println!( "{} is now {}", name, state );
//! });
//! assert_eq!( hooks.hook_count(), 1 );
//! ```

use std::sync::Arc ;
use parking_lot::RwLock ;
use tracing::{ debug, warn };
use wasmtime::{ Engine, Module };

use crate::loader::LoadError ;
use crate::woven::{ WovenState, WovenSymbol };



/// Error type a [`WeavingHook`] may fail with.
pub type HookError = Box<dyn std::error::Error + Send + Sync> ;

/// Rewrites the bytes of a symbol before it is compiled.
///
/// Implemented for every `Fn( &str, &mut Vec<u8> ) -> Result<(), HookError>`.
pub trait WeavingHook: Send + Sync {
	/// Transforms `bytes`, the current contents of the symbol `name`, in place.
	fn weave( &self, name: &str, bytes: &mut Vec<u8> ) -> Result<(), HookError> ;
}

impl<F> WeavingHook for F
where
	F: Fn( &str, &mut Vec<u8> ) -> Result<(), HookError> + Send + Sync,
{
	fn weave( &self, name: &str, bytes: &mut Vec<u8> ) -> Result<(), HookError> { self( name, bytes ) }
}

/// Observes weaving progress.
///
/// Implemented for every `Fn( &str, WovenState )`.
pub trait WovenListener: Send + Sync {
	/// Called when the attempt for `name` reaches `state`.
	fn modified( &self, name: &str, state: WovenState );
	/// Called once with the finished attempt, after its terminal state was
	/// reached. Like every notification, only sent for attempts that ran hooks.
	fn finished( &self, _attempt: &WovenSymbol ) {}
}

impl<F> WovenListener for F
where
	F: Fn( &str, WovenState ) + Send + Sync,
{
	fn modified( &self, name: &str, state: WovenState ) { self( name, state ) }
}

/// The hooks and listeners of a loader.
///
/// A registry may be shared by several loaders. Registration may happen at any
/// time; an attempt works on the hooks registered when it started.
#[derive( Default )]
pub struct HookRegistry {
	hooks: RwLock<Vec<Arc<dyn WeavingHook>>>,
	listeners: RwLock<Vec<Arc<dyn WovenListener>>>,
}

impl HookRegistry {

	pub fn new() -> Self { Self::default() }

	/// Appends a hook to the chain.
	pub fn register_hook( &self, hook: impl WeavingHook + 'static ) {
		self.hooks.write().push( Arc::new( hook ));
	}

	/// Appends a listener.
	pub fn register_listener( &self, listener: impl WovenListener + 'static ) {
		self.listeners.write().push( Arc::new( listener ));
	}

	#[inline] pub fn hook_count( &self ) -> usize { self.hooks.read().len() }
	#[inline] pub fn listener_count( &self ) -> usize { self.listeners.read().len() }

	/// Runs `raw` through the hook chain and compiles the result.
	///
	/// Returns the module and whether any hook ran.
	pub(crate) fn weave( &self, engine: &Engine, name: &str, raw: Vec<u8> ) -> Result<( Module, bool ), LoadError> {

		let hooks = self.hooks.read().clone();
		let listeners = match hooks.is_empty() {
			true => Vec::with_capacity( 0 ),
			false => self.listeners.read().clone(),
		};
		let mut attempt = Attempt { symbol: WovenSymbol::new( name, raw ), listeners };

		if !hooks.is_empty() {
			attempt.advance( WovenState::Transforming );
			for hook in &hooks {
				if let Err( reason ) = hook.weave( name, attempt.symbol.bytes_mut() ) {
					let error = LoadError::TransformFailed { name: name.to_string(), reason: Arc::new( reason )};
					warn!( symbol = name, %error, "weaving hook failed" );
					return Err( attempt.fail( WovenState::TransformingFailed, error ));
				}
			}
			attempt.advance( WovenState::Transformed );
			debug!( symbol = name, hooks = hooks.len(), "woven" );
		}

		match define( engine, name, attempt.symbol.bytes() ) {
			Ok( module ) => {
				attempt.advance( WovenState::Defined );
				Ok(( module, !hooks.is_empty() ))
			},
			Err( error ) => Err( attempt.fail( WovenState::DefineFailed, error )),
		}

	}

}

impl std::fmt::Debug for HookRegistry {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "HookRegistry" )
			.field( "hooks", &self.hook_count() )
			.field( "listeners", &self.listener_count() )
			.finish()
	}
}

struct Attempt {
	symbol: WovenSymbol,
	listeners: Vec<Arc<dyn WovenListener>>,
}

impl Attempt {

	fn advance( &mut self, next: WovenState ) {
		let moved = self.symbol.transition( next );
		debug_assert!( moved.is_ok(), "weaving pipeline out of order: {moved:?}" );
		if moved.is_err() { return }
		if next.is_broadcast() {
			self.listeners.iter().for_each(| listener | listener.modified( self.symbol.name(), next ));
		}
		if next.is_terminal() {
			self.listeners.iter().for_each(| listener | listener.finished( &self.symbol ));
		}
	}

	fn fail( mut self, state: WovenState, error: LoadError ) -> LoadError {
		self.symbol.record_failure( error.clone() );
		self.advance( state );
		error
	}

}

/// Compiles `bytes` into a module without running any hook.
pub(crate) fn define( engine: &Engine, name: &str, bytes: &[u8] ) -> Result<Module, LoadError> {
	Module::new( engine, bytes )
		.map_err(| reason | LoadError::DefineFailed { name: name.to_string(), reason: Arc::new( reason )})
		.inspect(| _ | debug!( symbol = name, "defined" ))
		.inspect_err(| error | warn!( symbol = name, %error, "definition failed" ))
}



#[cfg( test )]
mod tests {

	use super::* ;
	use parking_lot::Mutex ;

	const VALID: &str = r#"(module (func (export "run")))"# ;
	const DUPLICATE_EXPORT: &str = r#"(module (func (export "run")) (func (export "run")))"# ;

	fn recording( registry: &HookRegistry ) -> Arc<Mutex<Vec<WovenState>>> {
		let states = Arc::new( Mutex::new( Vec::new() ));
		let sink = states.clone();
		registry.register_listener( move | _: &str, state: WovenState | sink.lock().push( state ));
		states
	}

	#[test]
	fn hookless_define_broadcasts_nothing() {
		let registry = HookRegistry::new();
		let states = recording( &registry );
		let engine = Engine::default();
		let ( _, woven ) = registry.weave( &engine, "a.B", VALID.into() ).expect( "defines" );
		assert!( !woven );
		assert!( registry.weave( &engine, "a.B", DUPLICATE_EXPORT.into() ).is_err() );
		assert!( states.lock().is_empty() );
	}

	struct Finished( Arc<Mutex<Vec<( String, WovenState, usize )>>> );

	impl WovenListener for Finished {
		fn modified( &self, _: &str, _: WovenState ) {}
		fn finished( &self, attempt: &WovenSymbol ) {
			self.0.lock().push(( attempt.name().to_string(), attempt.state(), attempt.failures().len() ));
		}
	}

	#[test]
	fn finished_attempt_carries_its_failures() {
		let registry = HookRegistry::new();
		let finished = Arc::new( Mutex::new( Vec::new() ));
		registry.register_listener( Finished( finished.clone() ));
		registry.register_hook(| name: &str, _: &mut Vec<u8> | -> Result<(), HookError> {
			match name { "a.Bad" => Err( "rejected".into() ), _ => Ok(()) }
		});
		let engine = Engine::default();

		assert!( registry.weave( &engine, "a.Good", VALID.into() ).is_ok() );
		assert!( matches!(
			registry.weave( &engine, "a.Bad", VALID.into() ),
			Err( LoadError::TransformFailed { .. }),
		));
		assert!( matches!(
			registry.weave( &engine, "a.Broken", DUPLICATE_EXPORT.into() ),
			Err( LoadError::DefineFailed { .. }),
		));

		assert_eq!( *finished.lock(), vec![
			( "a.Good".to_string(), WovenState::Defined, 0 ),
			( "a.Bad".to_string(), WovenState::TransformingFailed, 1 ),
			( "a.Broken".to_string(), WovenState::DefineFailed, 1 ),
		]);
	}

	#[test]
	#[cfg( debug_assertions )]
	#[should_panic( expected = "weaving pipeline out of order" )]
	fn attempt_rejects_out_of_order_step() {
		let mut attempt = Attempt { symbol: WovenSymbol::new( "a.B", Vec::new() ), listeners: Vec::new() };
		attempt.advance( WovenState::Transformed );
	}

	#[test]
	fn hooks_run_in_registration_order() {
		let registry = HookRegistry::new();
		let order = Arc::new( Mutex::new( Vec::new() ));
		let ( first, second ) = ( order.clone(), order.clone() );
		registry.register_hook( move | _: &str, _: &mut Vec<u8> | -> Result<(), HookError> { first.lock().push( 1 ); Ok(()) });
		registry.register_hook( move | _: &str, _: &mut Vec<u8> | -> Result<(), HookError> { second.lock().push( 2 ); Ok(()) });
		let states = recording( &registry );
		let ( _, woven ) = registry.weave( &Engine::default(), "a.B", VALID.into() ).expect( "defines" );
		assert!( woven );
		assert_eq!( *order.lock(), vec![ 1, 2 ]);
		assert_eq!( *states.lock(), vec![ WovenState::Transformed ]);
	}

}
