//! Unit revisions and the content they package.
//!
//! A [`UnitRevision`] is one version of a deployable unit. It is identified by a
//! [`RevisionId`] and carries its packaged [`Content`]. Revisions are immutable
//! once created; the wiring graph and every loader share them through `Arc`.

use std::collections::HashMap ;
use std::sync::Arc ;



/// Unique identifier for a unit revision.
///
/// Used as the node key of the wiring graph and to tell apart the revision that
/// actually supplied a symbol's bytes when resolution crosses unit boundaries.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd )]
pub struct RevisionId( u64 );

impl RevisionId {
	/// Creates a new revision identifier from a `u64`.
	pub const fn new( id: u64 ) -> Self { Self( id )}
}

impl std::fmt::Display for RevisionId {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> Result<(),std::fmt::Error> {
		std::fmt::Display::fmt( &self.0, f )
	}
}

impl From<RevisionId> for u64 {
	fn from( id: RevisionId ) -> Self { id.0 }
}

/// Read access to packaged content, keyed by entry path.
///
/// Implement this trait to define where a unit's bytes come from: an archive on
/// disk, an embedded table, a fragment archive, or the base runtime itself. The
/// loader treats it as an opaque lookup and assumes lookups are side-effect free
/// and idempotent, since a revision's content never changes once packaged.
///
/// # Example
///
/// ```
/// use wasm_lazy_link::Content ;
///
/// struct Single( Vec<u8> );
///
/// impl Content for Single {
/// 	fn entry_bytes( &self, path: &str ) -> Option<Vec<u8>> {
/// 		( path == "only.wasm" ).then(|| self.0.clone())
/// 	}
/// }
/// ```
pub trait Content: Send + Sync {

	/// Returns the bytes stored under `path`, if there is such an entry.
	fn entry_bytes( &self, path: &str ) -> Option<Vec<u8>> ;

	/// Returns `true` if an entry exists under `path`.
	///
	/// Defaults to fetching the entry; override when existence is cheaper to
	/// check than a full read.
	fn has_entry( &self, path: &str ) -> bool { self.entry_bytes( path ).is_some() }

}

/// [`Content`] held in memory, mostly useful for embedding and tests.
#[derive( Debug, Clone, Default )]
pub struct MemoryContent {
	entries: HashMap<String, Vec<u8>>,
}

impl MemoryContent {

	/// Creates empty content.
	pub fn new() -> Self { Self::default() }

	/// Adds an entry, replacing any previous entry under the same path.
	pub fn with_entry( mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>> ) -> Self {
		self.entries.insert( path.into(), bytes.into() );
		self
	}

	/// Number of entries.
	#[inline] pub fn len( &self ) -> usize { self.entries.len() }

	/// Whether there are no entries.
	#[inline] pub fn is_empty( &self ) -> bool { self.entries.is_empty() }

}

impl<P: Into<String>, B: Into<Vec<u8>>> FromIterator<( P, B )> for MemoryContent {
	fn from_iter<T: IntoIterator<Item = ( P, B )>>( iter: T ) -> Self {
		Self { entries: iter.into_iter().map(|( path, bytes )| ( path.into(), bytes.into() )).collect() }
	}
}

impl Content for MemoryContent {
	fn entry_bytes( &self, path: &str ) -> Option<Vec<u8>> { self.entries.get( path ).cloned() }
	fn has_entry( &self, path: &str ) -> bool { self.entries.contains_key( path ) }
}

/// One immutable version of a deployable unit.
///
/// The revision's own content is the first element of its wiring's content path;
/// fragments attached through the [`Wiring`]( crate::Wiring ) follow it.
pub struct UnitRevision {
	/// Identity of this revision within the module system
	id: RevisionId,
	/// Human readable unit name (e.g., "acme.math")
	name: String,
	/// Packaged content of this revision
	content: Arc<dyn Content>,
}

impl UnitRevision {

	/// Creates a new revision over the given content.
	pub fn new(
		id: RevisionId,
		name: impl Into<String>,
		content: impl Content + 'static,
	) -> Self {
		Self { id, name: name.into(), content: Arc::new( content ) }
	}

	/// Creates a new revision over content that is already shared.
	pub fn from_shared( id: RevisionId, name: impl Into<String>, content: Arc<dyn Content> ) -> Self {
		Self { id, name: name.into(), content }
	}

	/// Identity of this revision.
	#[inline] pub fn id( &self ) -> RevisionId { self.id }

	/// Unit name.
	#[inline] pub fn name( &self ) -> &str { &self.name }

	/// Packaged content of this revision.
	#[inline] pub fn content( &self ) -> &dyn Content { self.content.as_ref() }

}

impl std::fmt::Debug for UnitRevision {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "UnitRevision" )
			.field( "id", &self.id )
			.field( "name", &self.name )
			.field( "content", &"<Content>" )
			.finish()
	}
}
