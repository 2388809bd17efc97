pub mod cart;
pub mod clock;
pub mod event;
pub mod reservation;

pub use cart::*;
pub use clock::*;
pub use event::*;
pub use reservation::*;
