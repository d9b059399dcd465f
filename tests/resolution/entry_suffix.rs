use std::sync::Arc ;
use wasm_lazy_link::{ MemoryContent, RevisionId, UnitRevision, Wiring };
use crate::fixture_units ;

#[test]
fn resolution_test_entry_suffix() {

	let content = MemoryContent::new()
		.with_entry( "Main.wat", fixture_units::module( "from-default-package" ));
	let revision = Arc::new( UnitRevision::new( RevisionId::new( 1 ), "acme.app", content ));
	let wiring = Wiring::builder( revision ).build();

	assert!( fixture_units::loader( wiring.clone() ).load( "Main" ).is_err() );

	let loader = fixture_units::loader( wiring ).with_entry_suffix( ".wat" );
	let main = loader.load( "Main" ).expect( "Failed to load symbol of the default package" );
	assert_exports!( &main, "from-default-package" );

}
