//! Symbol location over the wiring graph.
//!
//! The locator answers one question: which content source satisfies a name?
//! It walks a [`Wiring`] in a fixed precedence order and delegates into
//! providers' wirings through import and require wires. It never acquires a
//! load lock; only the loader that started the request does.

use std::sync::Arc ;
use dashmap::DashSet ;
use itertools::Itertools ;
use tracing::trace ;

use crate::revision::{ Content, RevisionId, UnitRevision };
use crate::wiring::{ WireKind, Wiring };



/// Where the bytes of a symbol come from, seen from the requesting unit.
#[derive( Debug, Clone )]
pub enum ContentSource {
	/// The base runtime the loader delegates to.
	Base,
	/// The requesting revision's own content.
	Local { revision: Arc<UnitRevision>, path: String },
	/// The content of a fragment attached to the requesting revision.
	Fragment { revision: Arc<UnitRevision>, path: String },
	/// A provider reached through an import wire. `revision` holds the entry.
	Imported { revision: Arc<UnitRevision>, path: String },
	/// A provider reached through a require wire. `revision` holds the entry.
	Required { revision: Arc<UnitRevision>, path: String },
}

impl ContentSource {

	/// The revision whose content holds the entry, `None` for the base runtime.
	pub fn revision( &self ) -> Option<&Arc<UnitRevision>> {
		match self {
			Self::Base => None,
			Self::Local { revision, .. }
			| Self::Fragment { revision, .. }
			| Self::Imported { revision, .. }
			| Self::Required { revision, .. } => Some( revision ),
		}
	}

	/// Identity of the revision whose content holds the entry.
	pub fn revision_id( &self ) -> Option<RevisionId> { self.revision().map(| revision | revision.id() ) }

	/// Whether this source is the base runtime.
	#[inline] pub fn is_base( &self ) -> bool { matches!( self, Self::Base ) }

	/// Reads the symbol's bytes from this source.
	pub(crate) fn fetch_bytes( &self, base: Option<&dyn Content>, path: &str ) -> Option<Vec<u8>> {
		match self {
			Self::Base => base.and_then(| base | base.entry_bytes( path )),
			Self::Local { revision, path }
			| Self::Fragment { revision, path }
			| Self::Imported { revision, path }
			| Self::Required { revision, path } => revision.content().entry_bytes( path ),
		}
	}

	/// Re-expresses a provider's answer from the perspective of the wiring that
	/// followed a `kind` wire to get it.
	fn through( self, kind: WireKind ) -> Self {
		match self {
			Self::Base => Self::Base,
			Self::Local { revision, path }
			| Self::Fragment { revision, path }
			| Self::Imported { revision, path }
			| Self::Required { revision, path } => match kind {
				WireKind::Import => Self::Imported { revision, path },
				WireKind::Require => Self::Required { revision, path },
			},
		}
	}

}

impl std::fmt::Display for ContentSource {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		match self {
			Self::Base => write!( f, "base runtime" ),
			Self::Local { revision, .. } => write!( f, "local content of {}", revision.id() ),
			Self::Fragment { revision, .. } => write!( f, "fragment {}", revision.id() ),
			Self::Imported { revision, .. } => write!( f, "import from {}", revision.id() ),
			Self::Required { revision, .. } => write!( f, "require from {}", revision.id() ),
		}
	}
}

/// Symbol names the base runtime was asked for and did not hold.
///
/// Each name flips from "attempt" to "skip" at most once; later lookups of that
/// name go straight to unit content. Other names of the same package are still
/// offered to the base runtime.
#[derive( Debug, Default )]
pub(crate) struct FailedDelegations {
	names: DashSet<String>,
}

impl FailedDelegations {
	pub(crate) fn skips( &self, name: &str ) -> bool { self.names.contains( name ) }
	pub(crate) fn record( &self, name: &str ) -> bool { self.names.insert( name.to_string() ) }
}

/// How a [`Locator`] uses the failed-delegation memo.
#[derive( Debug, Clone, Copy )]
pub(crate) enum Memo<'a> {
	Off,
	/// Skips remembered misses without adding new ones.
	Read( &'a FailedDelegations ),
	/// Skips remembered misses and remembers new ones.
	Update( &'a FailedDelegations ),
}

impl Memo<'_> {
	fn skips( self, name: &str ) -> bool {
		match self {
			Self::Off => false,
			Self::Read( failed ) | Self::Update( failed ) => failed.skips( name ),
		}
	}
	fn record( self, name: &str ) {
		if let Self::Update( failed ) = self {
			if failed.record( name ) {
				trace!( symbol = name, "base runtime lacks symbol, skipping it from now on" );
			}
		}
	}
}

/// Returns the package of a dot separated symbol name.
///
/// Names without a dot live in the default package `""`.
pub fn package_of( name: &str ) -> &str {
	name.rsplit_once( '.' ).map_or( "", |( package, _ )| package )
}

/// Returns the content entry path of a symbol name.
pub fn entry_path( name: &str, suffix: &str ) -> String {
	let mut path = name.replace( '.', "/" );
	path.push_str( suffix );
	path
}

/// Precedence walk shared by a loader and every provider it delegates into.
pub(crate) struct Locator<'a> {
	pub base: Option<&'a dyn Content>,
	pub memo: Memo<'a>,
	pub generated_prefixes: &'a [String],
}

impl Locator<'_> {

	/// Finds the source of `name` as seen from `wiring`.
	pub fn locate( &self, wiring: &Wiring, name: &str, path: &str ) -> Option<ContentSource> {

		let package = package_of( name );

		if let Some( source ) = self.delegate_to_base( wiring, name, package, path ) {
			return Some( source );
		}

		for ( revision, content ) in wiring.content_path() {
			if content.has_entry( path ) {
				return Some( match revision.id() == wiring.revision().id() {
					true => ContentSource::Local { revision: revision.clone(), path: path.to_string() },
					false => ContentSource::Fragment { revision: revision.clone(), path: path.to_string() },
				});
			}
		}

		// An import wire is authoritative for its package: a miss does not fall
		// through to requires.
		if let Some( provider ) = wiring.import( package ) {
			trace!( symbol = name, unit = %wiring.revision().id(), provider = %provider.revision().id(), "following import wire" );
			return self.locate( provider, name, path ).map(| source | source.through( WireKind::Import ));
		}

		if let Some( providers ) = wiring.required( package ) {
			let found = providers.iter().into_iter()
				.find_map(| provider | self.locate( provider, name, path ));
			if let Some( source ) = found {
				return Some( source.through( WireKind::Require ));
			}
		}

		if self.is_generated( name ) {
			return self.search_all_wires( wiring, name, path );
		}

		None
	}

	fn delegate_to_base( &self, wiring: &Wiring, name: &str, package: &str, path: &str ) -> Option<ContentSource> {
		let base = self.base?;
		if !wiring.boot_delegation().matches( package ) || self.memo.skips( name ) { return None }
		if base.has_entry( path ) { return Some( ContentSource::Base ) }
		self.memo.record( name );
		None
	}

	fn is_generated( &self, name: &str ) -> bool {
		self.generated_prefixes.iter().any(| prefix | name.starts_with( prefix.as_str() ))
	}

	/// Searches every wired provider regardless of package, imports before
	/// requires, each provider once.
	fn search_all_wires( &self, wiring: &Wiring, name: &str, path: &str ) -> Option<ContentSource> {
		let imports = wiring.wires().iter().filter(| wire | wire.kind() == WireKind::Import );
		let requires = wiring.wires().iter().filter(| wire | wire.kind() == WireKind::Require );
		imports.chain( requires )
			.unique_by(| wire | wire.provider().revision().id() )
			.find_map(| wire | self.locate( wire.provider(), name, path ).map(| source | source.through( wire.kind() )))
	}

}



#[cfg( test )]
mod tests {

	use super::* ;

	#[test]
	fn package_and_path_of_names() {
		assert_eq!( package_of( "acme.math.Adder" ), "acme.math" );
		assert_eq!( package_of( "Adder" ), "" );
		assert_eq!( entry_path( "acme.math.Adder", ".wasm" ), "acme/math/Adder.wasm" );
	}

	#[test]
	fn memo_is_kept_per_name() {
		let failed = FailedDelegations::default();
		Memo::Read( &failed ).record( "host.api.Missing" );
		assert!( !failed.skips( "host.api.Missing" ));
		Memo::Update( &failed ).record( "host.api.Missing" );
		assert!( Memo::Read( &failed ).skips( "host.api.Missing" ));
		assert!( !Memo::Update( &failed ).skips( "host.api.Clock" ));
		assert!( !Memo::Off.skips( "host.api.Missing" ));
	}

}
