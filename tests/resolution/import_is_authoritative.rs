use wasm_lazy_link::{ LoadError, Wiring };
use crate::fixture_units ;

#[test]
fn resolution_test_import_is_authoritative() {

	let imported = fixture_units::leaf( 2, "acme.math", &[( "acme.math.Adder", "from-import" )]);
	let required = fixture_units::leaf( 3, "acme.math.extra", &[
		( "acme.math.Adder", "from-require" ),
		( "acme.math.Divider", "from-require" ),
	]);
	let app = Wiring::builder( fixture_units::unit( 1, "acme.app", &[( "acme.math.Shadow", "from-app" )]))
		.import( "acme.math", imported )
		.require( "acme.math", required )
		.build();
	let loader = fixture_units::loader( app );

	let adder = loader.load( "acme.math.Adder" ).expect( "Failed to load imported symbol" );
	assert_exports!( &adder, "from-import" );

	match loader.load( "acme.math.Divider" ) {
		Err( LoadError::NotFound( name )) => assert_eq!( name, "acme.math.Divider" ),
		result => panic!( "Expected NotFound, found: {:?}", result ),
	}

	// own content is searched before any wire
	let shadow = loader.load( "acme.math.Shadow" ).expect( "Failed to load own symbol" );
	assert_exports!( &shadow, "from-app" );

}
