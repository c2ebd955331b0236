// Ready made transfer functions for common kinds of data.
// Control points are in normalized intensity, after the encoding range
// and intensity window were applied.

pub mod transfer_functions;
