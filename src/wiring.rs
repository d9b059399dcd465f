//! Resolved wiring of a unit revision.
//!
//! A [`Wiring`] is the finished output of wiring resolution for one
//! [`UnitRevision`]: which packages are delegated to the base runtime, which
//! fragments extend the revision's content, and which providers satisfy its
//! import and require declarations.
//!
//! Wirings are built bottom-up: a provider's wiring must exist before a wiring
//! that imports from it can be built. Providers are held as `Arc<Wiring>`, so the
//! graph is a DAG by construction and cannot contain import/require cycles.
//! Once built, a wiring is never mutated and is shared freely between threads
//! and loaders.

use std::collections::HashMap ;
use std::collections::hash_map::Entry ;
use std::sync::Arc ;
use itertools::Itertools ;
use nonempty_collections::NEVec ;
use pipe_trait::Pipe ;

use crate::revision::{ Content, UnitRevision };



/// Set of package patterns whose symbols are delegated to the base runtime.
///
/// Patterns follow the usual module-system conventions:
/// - `a.b` matches exactly the package `a.b`
/// - `a.b.*` matches every package below `a.b`, but not `a.b` itself
/// - `*` matches every package
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct BootDelegation {
	exact: Vec<String>,
	prefixes: Vec<String>,
	everything: bool,
}

impl BootDelegation {

	/// Delegates nothing.
	pub fn none() -> Self { Self::default() }

	/// Parses a list of package patterns.
	pub fn new( patterns: impl IntoIterator<Item = impl AsRef<str>> ) -> Self {
		patterns.into_iter().fold( Self::default(), | mut delegation, pattern | {
			match pattern.as_ref().trim() {
				"" => {},
				"*" => delegation.everything = true,
				pattern => match pattern.strip_suffix( '*' ) {
					// keep the trailing dot so `a.b.*` does not match `a.bc`
					Some( prefix ) => delegation.prefixes.push( prefix.to_string() ),
					None => delegation.exact.push( pattern.to_string() ),
				},
			}
			delegation
		})
	}

	/// Returns `true` if symbols of `package` are delegated to the base runtime.
	pub fn matches( &self, package: &str ) -> bool {
		self.everything
			|| self.exact.iter().any(| exact | exact == package )
			|| self.prefixes.iter().any(| prefix | package.starts_with( prefix.as_str() ))
	}

	/// Returns `true` if no package is delegated.
	pub fn is_empty( &self ) -> bool {
		!self.everything && self.exact.is_empty() && self.prefixes.is_empty()
	}

}

impl std::fmt::Display for BootDelegation {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		let everything = self.everything.then_some( "*".to_string() );
		let prefixes = self.prefixes.iter().map(| prefix | format!( "{}*", prefix ));
		write!( f, "[{}]", everything.into_iter().chain( self.exact.iter().cloned() ).chain( prefixes ).join( ", " ))
	}
}

/// How a wire was declared.
#[derive( Debug, Copy, Clone, PartialEq, Eq, Hash )]
pub enum WireKind {
	/// A package import satisfied by exactly one provider.
	Import,
	/// A require-style dependency; a package may have several providers.
	Require,
}

impl std::fmt::Display for WireKind {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { write!( f, "{:?}", self )}
}

/// A single resolved dependency edge of a [`Wiring`].
#[derive( Clone )]
pub struct Wire {
	kind: WireKind,
	package: String,
	provider: Arc<Wiring>,
}

impl Wire {
	/// Whether this edge came from an import or a require.
	#[inline] pub fn kind( &self ) -> WireKind { self.kind }
	/// The package this edge satisfies.
	#[inline] pub fn package( &self ) -> &str { &self.package }
	/// The wiring of the providing revision.
	#[inline] pub fn provider( &self ) -> &Arc<Wiring> { &self.provider }
}

impl std::fmt::Debug for Wire {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Wire" )
			.field( "kind", &self.kind )
			.field( "package", &self.package )
			.field( "provider", &self.provider.revision().id() )
			.finish()
	}
}

/// The resolved wiring graph node of one [`UnitRevision`].
///
/// Built through [`Wiring::builder`]. See the [module docs]( self ) for the
/// construction invariants.
pub struct Wiring {
	revision: Arc<UnitRevision>,
	boot_delegation: BootDelegation,
	fragments: Vec<Arc<UnitRevision>>,
	imports: HashMap<String, Arc<Wiring>>,
	requires: HashMap<String, NEVec<Arc<Wiring>>>,
	wires: Vec<Wire>,
}

impl Wiring {

	/// Starts building the wiring of `revision`.
	pub fn builder( revision: Arc<UnitRevision> ) -> WiringBuilder {
		WiringBuilder {
			revision,
			boot_delegation: BootDelegation::none(),
			fragments: Vec::with_capacity( 0 ),
			imports: HashMap::with_capacity( 0 ),
			requires: HashMap::with_capacity( 0 ),
			wires: Vec::with_capacity( 0 ),
		}
	}

	/// The revision this wiring belongs to.
	#[inline] pub fn revision( &self ) -> &Arc<UnitRevision> { &self.revision }

	/// Packages delegated to the base runtime.
	#[inline] pub fn boot_delegation( &self ) -> &BootDelegation { &self.boot_delegation }

	/// Attached fragments, in declaration order.
	#[inline] pub fn fragments( &self ) -> &[Arc<UnitRevision>] { &self.fragments }

	/// Every wire, in declaration order.
	#[inline] pub fn wires( &self ) -> &[Wire] { &self.wires }

	/// The provider importing `package` is wired to, if any.
	#[inline] pub fn import( &self, package: &str ) -> Option<&Arc<Wiring>> { self.imports.get( package ) }

	/// The ordered providers of a required `package`, if any.
	#[inline] pub fn required( &self, package: &str ) -> Option<&NEVec<Arc<Wiring>>> { self.requires.get( package ) }

	/// Own content followed by each fragment's content, each paired with the
	/// revision it belongs to.
	pub fn content_path( &self ) -> impl Iterator<Item = ( &Arc<UnitRevision>, &dyn Content )> {
		std::iter::once( &self.revision )
			.chain( self.fragments.iter() )
			.map(| revision | ( revision, revision.content() ))
	}

}

impl std::fmt::Debug for Wiring {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Wiring" )
			.field( "revision", &self.revision )
			.field( "boot_delegation", &self.boot_delegation )
			.field( "fragments", &self.fragments.iter().map(| fragment | fragment.id() ).collect::<Vec<_>>() )
			.field( "wires", &self.wires )
			.finish()
	}
}

/// Builder for [`Wiring`], produced by [`Wiring::builder`].
#[must_use = "call .build() to obtain the Wiring"]
pub struct WiringBuilder {
	revision: Arc<UnitRevision>,
	boot_delegation: BootDelegation,
	fragments: Vec<Arc<UnitRevision>>,
	imports: HashMap<String, Arc<Wiring>>,
	requires: HashMap<String, NEVec<Arc<Wiring>>>,
	wires: Vec<Wire>,
}

impl WiringBuilder {

	/// Sets the packages delegated to the base runtime.
	pub fn boot_delegation( mut self, boot_delegation: BootDelegation ) -> Self {
		self.boot_delegation = boot_delegation ;
		self
	}

	/// Attaches a fragment. Fragment content is searched after the host's own
	/// content, in the order fragments were attached.
	pub fn fragment( mut self, fragment: Arc<UnitRevision> ) -> Self {
		self.fragments.push( fragment );
		self
	}

	/// Wires an import of `package` to `provider`.
	///
	/// A package has at most one import wire; later imports of an already
	/// imported package are ignored.
	pub fn import( mut self, package: impl Into<String>, provider: Arc<Wiring> ) -> Self {
		let package = package.into();
		if let Entry::Vacant( entry ) = self.imports.entry( package.clone() ) {
			entry.insert( provider.clone() );
			self.wires.push( Wire { kind: WireKind::Import, package, provider });
		}
		self
	}

	/// Adds `provider` to the ordered providers of the required `package`.
	pub fn require( mut self, package: impl Into<String>, provider: Arc<Wiring> ) -> Self {
		let package = package.into();
		match self.requires.entry( package.clone() ) {
			Entry::Occupied( mut entry ) => entry.get_mut().push( provider.clone() ),
			Entry::Vacant( entry ) => { entry.insert( NEVec::new( provider.clone() )); },
		}
		self.wires.push( Wire { kind: WireKind::Require, package, provider });
		self
	}

	/// Finishes the wiring. It is immutable from here on.
	pub fn build( self ) -> Arc<Wiring> {
		Wiring {
			revision: self.revision,
			boot_delegation: self.boot_delegation,
			fragments: self.fragments,
			imports: self.imports,
			requires: self.requires,
			wires: self.wires,
		}.pipe( Arc::new )
	}

}



#[cfg( test )]
mod tests {

	use super::* ;
	use crate::revision::{ MemoryContent, RevisionId };

	fn revision( id: u64 ) -> Arc<UnitRevision> {
		Arc::new( UnitRevision::new( RevisionId::new( id ), format!( "unit-{}", id ), MemoryContent::new() ))
	}

	#[test]
	fn boot_delegation_patterns() {
		let delegation = BootDelegation::new([ "host.api", "host.rt.*", "" ]);
		assert!( delegation.matches( "host.api" ));
		assert!( !delegation.matches( "host.api.inner" ));
		assert!( delegation.matches( "host.rt.mem" ));
		assert!( delegation.matches( "host.rt.mem.deep" ));
		assert!( !delegation.matches( "host.rt" ));
		assert!( !delegation.matches( "host.rtx" ));
		assert!( BootDelegation::new([ "*" ]).matches( "" ));
		assert!( BootDelegation::none().is_empty() );
		assert_eq!( delegation.to_string(), "[host.api, host.rt.*]" );
	}

	#[test]
	fn first_import_wins_and_requires_keep_order() {
		let first = Wiring::builder( revision( 2 )).build();
		let second = Wiring::builder( revision( 3 )).build();
		let wiring = Wiring::builder( revision( 1 ))
			.import( "p", first.clone() )
			.import( "p", second.clone() )
			.require( "q", second.clone() )
			.require( "q", first.clone() )
			.build();

		assert_eq!( wiring.import( "p" ).map(| w | w.revision().id() ), Some( RevisionId::new( 2 )));
		let providers = wiring.required( "q" ).expect( "require wired" )
			.iter().into_iter().map(| w | w.revision().id() ).collect::<Vec<_>>();
		assert_eq!( providers, vec![ RevisionId::new( 3 ), RevisionId::new( 2 )]);
		assert_eq!( wiring.wires().len(), 3 );
	}

}
