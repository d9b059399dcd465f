use std::sync::Arc ;
use wasm_lazy_link::{ LoadError, RevisionId, UnitRevision, Wiring };
use crate::fixture_units ;
use crate::fixture_units::CountingContent ;

#[test]
fn resolution_test_not_found_is_cached() {

	let content = CountingContent::new( fixture_units::symbols( &[( "acme.app.Main", "from-app" )]));
	let revision = Arc::new( UnitRevision::from_shared( RevisionId::new( 1 ), "acme.app", content.clone() ));
	let loader = fixture_units::loader( Wiring::builder( revision ).build() );

	assert!( matches!( loader.load( "acme.app.Missing" ), Err( LoadError::NotFound( _ ))));
	assert_eq!( content.lookups(), 1 );
	assert!( loader.cached( "acme.app.Missing" ).is_some_and(| accessor | accessor.is_not_found() ));

	assert!( matches!( loader.load( "acme.app.Missing" ), Err( LoadError::NotFound( _ ))));
	assert_eq!( content.lookups(), 1 );

	let first = loader.load( "acme.app.Main" ).expect( "Failed to load own symbol" );
	let second = loader.load( "acme.app.Main" ).expect( "Failed to load own symbol" );
	assert!( Arc::ptr_eq( &first, &second ));
	assert_eq!( content.lookups(), 2 );
	assert_eq!( loader.lock_handles(), 0 );

}
