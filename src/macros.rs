macro_rules! dispatch_target {
    ($type:ident: $target:expr => $expr:expr) => {{
        use crate::codegen::{arduino::Arduino, esp32::Esp32, pico::Pico, rpi::Rpi, ros2::Ros2};

        match $target {
            Target::Arduino => {
                type $type = Arduino;
                $expr
            }

            Target::Esp32 => {
                type $type = Esp32;
                $expr
            }

            Target::Rpi => {
                type $type = Rpi;
                $expr
            }

            Target::Pico => {
                type $type = Pico;
                $expr
            }

            Target::Ros2 => {
                type $type = Ros2;
                $expr
            }
        }
    }};
}

macro_rules! emit {
    ($gen:expr, $($format:tt)*) => {
        write!($gen.out, $($format)*)
    };
}

macro_rules! emit_line {
    ($gen:expr, $($format:tt)*) => {{
        $gen.write_indent()?;
        writeln!($gen.out, $($format)*)
    }};
}
