// Calibration document persistence
//
// The calibration document is a hierarchical tagged XML file:
//
//   <calibrationData>
//     <device id="SERIAL">
//       <Channel id="..."> <Bucket id="..."> <Range id="...">
//         <BaseMean>..</BaseMean> ... <CalibInterceptErr>..</CalibInterceptErr>
//       </Range> </Bucket> </Channel>
//     </device>
//   </calibrationData>
//
// reader parses a document into a CalibrationStore, writer serializes a
// store back into the same schema; the two are round-trip partners.

pub mod reader;
pub mod writer;

pub use reader::{parse_file, parse_str};
pub use writer::{write_file, write_string};
