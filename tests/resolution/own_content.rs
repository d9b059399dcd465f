use wasm_lazy_link::{ ContentSource, RevisionId };
use crate::fixture_units ;

#[test]
fn resolution_test_own_content() {

	let loader = fixture_units::loader( fixture_units::leaf( 1, "acme.app", &[( "acme.app.Main", "from-app" )]));

	let symbol = loader.load( "acme.app.Main" ).expect( "Failed to load own symbol" );
	assert_exports!( &symbol, "from-app" );
	match symbol.source() {
		ContentSource::Local { revision, path } => {
			assert_eq!( revision.id(), RevisionId::new( 1 ));
			assert_eq!( path, "acme/app/Main.wasm" );
		},
		source => panic!( "Expected Local, found: {:?}", source ),
	}
	assert!( !symbol.is_woven() );

}
