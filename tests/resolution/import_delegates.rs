use wasm_lazy_link::{ ContentSource, RevisionId, Wiring };
use crate::fixture_units ;

#[test]
fn resolution_test_import_delegates() {

	let core = fixture_units::leaf( 3, "acme.core", &[( "acme.core.Alloc", "from-core" )]);
	let legacy = fixture_units::leaf( 4, "acme.math.legacy", &[( "acme.math.Adder", "from-legacy" )]);
	let math = Wiring::builder( fixture_units::unit( 2, "acme.math", &[( "acme.math.Adder", "from-math" )]))
		.import( "acme.core", core )
		.import( "acme.math", legacy )
		.build();
	let app = Wiring::builder( fixture_units::unit( 1, "acme.app", &[]))
		.import( "acme.math", math.clone() )
		.import( "acme.core", math.clone() )
		.build();

	let loader = fixture_units::loader( app );
	let provider_loader = fixture_units::loader( math );

	// the provider's own content wins over the provider's further imports
	let adder = loader.load( "acme.math.Adder" ).expect( "Failed to load imported symbol" );
	assert_exports!( &adder, "from-math" );
	match adder.source() {
		ContentSource::Imported { revision, .. } => assert_eq!( revision.id(), RevisionId::new( 2 )),
		source => panic!( "Expected Imported, found: {:?}", source ),
	}

	// the provider resolves through its own import; the entry lives in acme.core
	let alloc = loader.load( "acme.core.Alloc" ).expect( "Failed to load transitively imported symbol" );
	assert_exports!( &alloc, "from-core" );
	assert!( matches!( alloc.source(), ContentSource::Imported { .. }));
	assert_eq!( alloc.source().revision_id(), Some( RevisionId::new( 3 )));

	assert!( loader.cached( "acme.math.Adder" ).is_some() );
	assert!( provider_loader.cached( "acme.math.Adder" ).is_none() );
	assert_eq!( provider_loader.lock_handles(), 0 );

}
