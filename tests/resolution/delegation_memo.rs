use std::sync::Arc ;
use wasm_lazy_link::{ BootDelegation, ContentSource, LoadError, RevisionId, UnitRevision, Wiring };
use crate::fixture_units ;
use crate::fixture_units::CountingContent ;

#[test]
fn resolution_test_delegation_memo() {

	let content = fixture_units::symbols( &[( "host.api.Clock", "from-app" )])
		.with_entry( "host/api/Broken.wasm", fixture_units::DUPLICATE_EXPORT );
	let wiring = Wiring::builder( Arc::new( UnitRevision::new( RevisionId::new( 1 ), "acme.app", content )))
		.boot_delegation( BootDelegation::new([ "host.api" ]))
		.build();

	let base = CountingContent::new( fixture_units::symbols( &[( "host.api.Clock", "from-base" )]));
	let loader = fixture_units::loader( wiring.clone() ).with_base_runtime( base.clone() );

	// a sibling miss does not stop the package from being delegated
	assert!( matches!( loader.load( "host.api.Missing" ), Err( LoadError::NotFound( _ ))));
	assert_eq!( base.lookups(), 1 );
	let clock = loader.load( "host.api.Clock" ).expect( "Failed to load delegated symbol" );
	assert_exports!( &clock, "from-base" );
	assert!( clock.source().is_base() );
	assert_eq!( base.lookups(), 2 );

	// locating leaves the memo untouched
	assert!( matches!( loader.locate( "host.api.Broken" ), Some( ContentSource::Local { .. })));
	assert!( matches!( loader.locate( "host.api.Broken" ), Some( ContentSource::Local { .. })));
	assert_eq!( base.lookups(), 4 );

	// a failed definition is retried, but the base runtime is asked only once
	assert!( matches!( loader.load( "host.api.Broken" ), Err( LoadError::DefineFailed { .. })));
	assert_eq!( base.lookups(), 5 );
	assert!( matches!( loader.load( "host.api.Broken" ), Err( LoadError::DefineFailed { .. })));
	assert!( loader.locate( "host.api.Broken" ).is_some() );
	assert_eq!( base.lookups(), 5 );

	let base = CountingContent::new( fixture_units::symbols( &[( "host.api.Clock", "from-base" )]));
	let loader = fixture_units::loader( wiring )
		.with_base_runtime( base.clone() )
		.with_delegation_memo( false );

	assert!( loader.load( "host.api.Broken" ).is_err() );
	assert!( loader.load( "host.api.Broken" ).is_err() );
	assert_eq!( base.lookups(), 2 );

}
