//! Per-name memo of resolution results.
//!
//! Content is immutable for the lifetime of a revision, so once a name has been
//! resolved (or found to be unresolvable) the answer never changes. The cache is
//! insert-once: the first writer wins and entries are never evicted.

use std::sync::Arc ;
use dashmap::DashMap ;
use dashmap::mapref::entry::Entry ;

use crate::loader::Symbol ;
use crate::locator::ContentSource ;



/// A memoized resolution result.
#[derive( Debug, Clone )]
pub enum Accessor {
	/// The name was loaded; the symbol records which source supplied it.
	Resolved( Arc<Symbol> ),
	/// No source anywhere in the reachable wiring satisfies the name.
	NotFound,
}

impl Accessor {

	/// The content source that satisfied the name, if it was resolved.
	pub fn source( &self ) -> Option<&ContentSource> {
		match self {
			Self::Resolved( symbol ) => Some( symbol.source() ),
			Self::NotFound => None,
		}
	}

	/// Whether this is the durable not-found sentinel.
	#[inline] pub fn is_not_found( &self ) -> bool { matches!( self, Self::NotFound ) }

}

/// Concurrent insert-once map from symbol name to [`Accessor`].
#[derive( Debug, Default )]
pub struct AccessorCache {
	entries: DashMap<String, Accessor>,
}

impl AccessorCache {

	pub fn new() -> Self { Self::default() }

	/// Returns the memoized result for `name`, if any.
	pub fn get( &self, name: &str ) -> Option<Accessor> {
		self.entries.get( name ).map(| entry | entry.value().clone() )
	}

	/// Memoizes `accessor` for `name` unless an entry already exists.
	///
	/// Returns the entry that is in the cache afterwards, which is `accessor`
	/// only if this call was the first writer.
	pub fn put( &self, name: &str, accessor: Accessor ) -> Accessor {
		if let Some( existing ) = self.get( name ) { return existing }
		match self.entries.entry( name.to_string() ) {
			Entry::Occupied( entry ) => entry.get().clone(),
			Entry::Vacant( entry ) => entry.insert( accessor ).value().clone(),
		}
	}

	/// Number of memoized names.
	#[inline] pub fn len( &self ) -> usize { self.entries.len() }

	/// Whether nothing has been memoized yet.
	#[inline] pub fn is_empty( &self ) -> bool { self.entries.is_empty() }

}



#[cfg( test )]
mod tests {

	use super::* ;

	#[test]
	fn first_writer_wins() {
		let cache = AccessorCache::new();
		assert!( cache.get( "a.B" ).is_none() );
		assert!( cache.put( "a.B", Accessor::NotFound ).is_not_found() );
		assert!( cache.put( "a.B", Accessor::NotFound ).is_not_found() );
		assert_eq!( cache.len(), 1 );
		assert!( cache.get( "a.B" ).is_some_and(| accessor | accessor.source().is_none() ));
	}

}
