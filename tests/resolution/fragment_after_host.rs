use wasm_lazy_link::{ ContentSource, RevisionId, Wiring };
use crate::fixture_units ;

#[test]
fn resolution_test_fragment_after_host() {

	let host = fixture_units::unit( 1, "acme.app", &[( "acme.app.Main", "from-host" )]);
	let fragment = fixture_units::unit( 2, "acme.app.l10n", &[
		( "acme.app.Main", "from-fragment" ),
		( "acme.app.Messages", "from-fragment" ),
	]);
	let loader = fixture_units::loader( Wiring::builder( host ).fragment( fragment ).build() );

	let main = loader.load( "acme.app.Main" ).expect( "Failed to load host symbol" );
	assert_exports!( &main, "from-host" );
	assert!( matches!( main.source(), ContentSource::Local { .. }));

	let messages = loader.load( "acme.app.Messages" ).expect( "Failed to load fragment symbol" );
	assert_exports!( &messages, "from-fragment" );
	match messages.source() {
		ContentSource::Fragment { revision, .. } => assert_eq!( revision.id(), RevisionId::new( 2 )),
		source => panic!( "Expected Fragment, found: {:?}", source ),
	}

}
