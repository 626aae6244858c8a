//! XEP modules attached to client streams.

pub mod xep0077;
