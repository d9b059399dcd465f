use std::sync::Arc ;
use parking_lot::Mutex ;
use wasm_lazy_link::{ HookError, HookRegistry, Wiring };
use crate::fixture_units ;

#[test]
fn weaving_test_imported_symbols_are_woven() {

	let math = fixture_units::leaf( 2, "acme.math", &[( "acme.math.Adder", "from-math" )]);
	let app = Wiring::builder( fixture_units::unit( 1, "acme.app", &[( "acme.app.Main", "from-app" )]))
		.import( "acme.math", math )
		.build();

	let seen = Arc::new( Mutex::new( Vec::new() ));
	let sink = seen.clone();
	let hooks = Arc::new( HookRegistry::new() );
	hooks.register_hook( move | name: &str, _: &mut Vec<u8> | -> Result<(), HookError> {
		sink.lock().push( name.to_string() );
		Ok(())
	});
	let loader = fixture_units::loader( app ).with_hooks( hooks );

	let adder = loader.load( "acme.math.Adder" ).expect( "Failed to load imported symbol" );
	let main = loader.load( "acme.app.Main" ).expect( "Failed to load own symbol" );
	assert!( adder.is_woven() && main.is_woven() );
	assert_eq!( *seen.lock(), vec![ "acme.math.Adder".to_string(), "acme.app.Main".to_string() ]);

}
