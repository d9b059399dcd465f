//! Per-attempt state of a symbol travelling through the weaving pipeline.

use thiserror::Error ;

use crate::loader::LoadError ;



/// Lifecycle state of one load attempt.
///
/// ```text
/// Raw ─▶ Transforming ─▶ Transformed ─▶ Defined
///  │          │               └───────▶ DefineFailed
///  │          └─▶ TransformingFailed
///  ├─▶ Defined        (no hooks registered)
///  └─▶ DefineFailed   (no hooks registered)
/// ```
///
/// No state is ever revisited within one attempt.
#[derive( Debug, Copy, Clone, PartialEq, Eq, Hash )]
pub enum WovenState {
	/// Bytes were read from content and nothing has touched them yet.
	Raw,
	/// Hooks are running.
	Transforming,
	/// Every hook completed.
	Transformed,
	/// A hook failed; the chain was cut short.
	TransformingFailed,
	/// The bytes compiled into a module.
	Defined,
	/// The bytes did not compile.
	DefineFailed,
}

impl WovenState {

	/// Returns `true` if `next` may follow `self`.
	pub fn can_move_to( self, next: Self ) -> bool {
		matches!(( self, next ),
			( Self::Raw, Self::Transforming | Self::Defined | Self::DefineFailed )
			| ( Self::Transforming, Self::Transformed | Self::TransformingFailed )
			| ( Self::Transformed, Self::Defined | Self::DefineFailed )
		)
	}

	/// Whether listeners are told about this state.
	///
	/// `Raw`, `Transforming` and `Defined` are internal; the rest are observable.
	#[inline] pub fn is_broadcast( self ) -> bool {
		matches!( self, Self::Transformed | Self::TransformingFailed | Self::DefineFailed )
	}

	/// Whether the attempt ends in this state.
	#[inline] pub fn is_terminal( self ) -> bool {
		matches!( self, Self::Defined | Self::DefineFailed | Self::TransformingFailed )
	}

}

impl std::fmt::Display for WovenState {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { write!( f, "{:?}", self )}
}

/// Returned when a pipeline step would break the [`WovenState`] ordering.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Error )]
#[error( "Invalid woven state transition from {from} to {to}" )]
pub struct InvalidTransition { pub from: WovenState, pub to: WovenState }

/// One load attempt of a single symbol.
///
/// Lives only for the duration of the attempt; the finished artifact is a
/// [`Symbol`]( crate::Symbol ). Listeners see the finished attempt, failures
/// included, through [`WovenListener::finished`]( crate::WovenListener::finished ).
#[derive( Debug )]
pub struct WovenSymbol {
	name: String,
	bytes: Vec<u8>,
	state: WovenState,
	failures: Vec<LoadError>,
}

impl WovenSymbol {

	pub fn new( name: impl Into<String>, raw: Vec<u8> ) -> Self {
		Self { name: name.into(), bytes: raw, state: WovenState::Raw, failures: Vec::with_capacity( 0 ) }
	}

	#[inline] pub fn name( &self ) -> &str { &self.name }
	#[inline] pub fn bytes( &self ) -> &[u8] { &self.bytes }
	#[inline] pub fn state( &self ) -> WovenState { self.state }

	/// Failures observed during this attempt, in order.
	#[inline] pub fn failures( &self ) -> &[LoadError] { &self.failures }

	pub(crate) fn bytes_mut( &mut self ) -> &mut Vec<u8> { &mut self.bytes }

	pub(crate) fn record_failure( &mut self, error: LoadError ) { self.failures.push( error ); }

	/// Moves the attempt to `next`.
	///
	/// # Errors
	/// Returns [`InvalidTransition`] if `next` may not follow the current state;
	/// the attempt is left unchanged.
	pub fn transition( &mut self, next: WovenState ) -> Result<WovenState, InvalidTransition> {
		if !self.state.can_move_to( next ) {
			return Err( InvalidTransition { from: self.state, to: next });
		}
		self.state = next ;
		Ok( next )
	}

}



#[cfg( test )]
mod tests {

	use super::* ;

	#[test]
	fn woven_happy_path() {
		let mut symbol = WovenSymbol::new( "a.B", Vec::new() );
		assert_eq!( symbol.transition( WovenState::Transforming ), Ok( WovenState::Transforming ));
		assert_eq!( symbol.transition( WovenState::Transformed ), Ok( WovenState::Transformed ));
		assert_eq!( symbol.transition( WovenState::Defined ), Ok( WovenState::Defined ));
		assert!( symbol.state().is_terminal() );
	}

	#[test]
	fn woven_states_are_never_revisited() {
		let mut symbol = WovenSymbol::new( "a.B", Vec::new() );
		assert!( symbol.transition( WovenState::Transforming ).is_ok() );
		assert_eq!(
			symbol.transition( WovenState::Raw ),
			Err( InvalidTransition { from: WovenState::Transforming, to: WovenState::Raw }),
		);
		assert!( symbol.transition( WovenState::TransformingFailed ).is_ok() );
		assert!( symbol.transition( WovenState::Defined ).is_err() );
		assert!( symbol.transition( WovenState::TransformingFailed ).is_err() );
	}

	#[test]
	fn woven_hookless_path_skips_transforming() {
		assert!( WovenState::Raw.can_move_to( WovenState::Defined ));
		assert!( WovenState::Raw.can_move_to( WovenState::DefineFailed ));
		assert!( !WovenState::Raw.can_move_to( WovenState::Transformed ));
		assert!( !WovenState::Defined.is_broadcast() );
		assert!( WovenState::DefineFailed.is_broadcast() );
	}

}
