//! Backend ROS2 (nodo C++ con rclcpp).
//!
//! El objetivo estructuralmente más divergente: no existe abstracción
//! directa de pines. Las escrituras GPIO/PWM se publican a los tópicos
//! `/gpio/out` y `/pwm/out`, las lecturas provienen de variables de
//! sensor cacheadas en el nodo (se asume la suscripción ya resuelta), y
//! el programa completo vive en un método `loop()` invocado por un
//! timer de pared de 10 ms. Un `loop forever` del fuente degrada a una
//! ejecución del cuerpo por tick, dado que el timer ya provee la
//! repetición.

use super::{Backend, Gen, Style};
use crate::ast::{Expr, FunctionDef, Program, Stmt};
use std::fmt::{self, Write};

pub(crate) struct Ros2;

impl Backend for Ros2 {
    const STYLE: Style = Style::CLike;
    const INDENT: &'static str = "  ";

    fn program(gen: &mut Gen<Self>, program: &Program) -> fmt::Result {
        emit!(gen, "// Build: place in a ROS2 package src/ and run: colcon build\n")?;
        emit!(gen, "// Run:   ros2 run <your_pkg> kinetrix_node\n\n")?;
        emit!(gen, "#include <rclcpp/rclcpp.hpp>\n")?;
        emit!(gen, "#include <std_msgs/msg/bool.hpp>\n")?;
        emit!(gen, "#include <std_msgs/msg/float64.hpp>\n")?;
        emit!(gen, "#include <std_msgs/msg/string.hpp>\n")?;
        emit!(gen, "#include <chrono>\n")?;
        emit!(gen, "#include <algorithm>\n")?;
        emit!(gen, "#include <cmath>\n\n")?;
        emit!(gen, "using namespace std::chrono_literals;\n\n")?;

        gen.hoisted_functions(program)?;

        emit!(gen, "class KinetrixNode : public rclcpp::Node {{\n")?;
        emit!(gen, "public:\n")?;
        gen.with_indent(|gen| {
            emit_line!(gen, "KinetrixNode() : Node(\"kinetrix_node\") {{")?;
            gen.with_indent(|gen| {
                emit_line!(
                    gen,
                    "gpio_pub_ = create_publisher<std_msgs::msg::Bool>(\"/gpio/out\", 10);"
                )?;
                emit_line!(
                    gen,
                    "pwm_pub_ = create_publisher<std_msgs::msg::Float64>(\"/pwm/out\", 10);"
                )?;
                emit_line!(gen, "// Timer drives the main robot loop")?;
                emit_line!(
                    gen,
                    "timer_ = create_wall_timer(10ms, std::bind(&KinetrixNode::loop, this));"
                )
            })?;
            emit_line!(gen, "}}")
        })?;
        emit!(gen, "\nprivate:\n")?;
        gen.with_indent(|gen| {
            emit_line!(gen, "rclcpp::Publisher<std_msgs::msg::Bool>::SharedPtr gpio_pub_;")?;
            emit_line!(
                gen,
                "rclcpp::Publisher<std_msgs::msg::Float64>::SharedPtr pwm_pub_;"
            )?;
            emit_line!(gen, "rclcpp::TimerBase::SharedPtr timer_;")?;
            emit_line!(gen, "double sensor_val_0_ = 0.0, pin_state_0_ = 0.0;")?;
            gen.blank_line()?;
            emit_line!(gen, "void loop() {{")?;
            gen.with_indent(|gen| gen.top_level(program))?;
            emit_line!(gen, "}}")
        })?;
        emit!(gen, "}};\n\n")?;

        emit!(gen, "int main(int argc, char **argv) {{\n")?;
        gen.with_indent(|gen| {
            emit_line!(gen, "rclcpp::init(argc, argv);")?;
            emit_line!(gen, "rclcpp::spin(std::make_shared<KinetrixNode>());")?;
            emit_line!(gen, "rclcpp::shutdown();")?;
            emit_line!(gen, "return 0;")
        })?;
        emit!(gen, "}}\n")
    }

    // Los identificadores del fuente son miembros del nodo
    fn ident(gen: &mut Gen<Self>, name: &str) -> fmt::Result {
        emit!(gen, "{}_", name)
    }

    fn string_lit(gen: &mut Gen<Self>, value: &str) -> fmt::Result {
        emit!(gen, "std::string(\"{}\")", value)
    }

    fn bool_lit(gen: &mut Gen<Self>, value: bool) -> fmt::Result {
        emit!(gen, "{}", value)
    }

    fn modulo(gen: &mut Gen<Self>, left: &Expr, right: &Expr) -> fmt::Result {
        emit!(gen, "(")?;
        gen.expr(left)?;
        emit!(gen, " % ")?;
        gen.expr(right)?;
        emit!(gen, ")")
    }

    fn call(gen: &mut Gen<Self>, name: &str, args: &[Expr]) -> fmt::Result {
        match (name, args.len()) {
            ("map", 5) => gen.affine_map(args, "(int)((", "/"),
            ("constrain", 3) => gen.clamp(args, "std::max", "std::min"),
            ("min", 2) => gen.plain_call("std::min", args),
            ("max", 2) => gen.plain_call("std::max", args),
            ("random", 2) => {
                emit!(gen, "(")?;
                gen.expr(&args[0])?;
                emit!(gen, " + std::rand() % (int)(")?;
                gen.expr(&args[1])?;
                emit!(gen, " - ")?;
                gen.expr(&args[0])?;
                emit!(gen, " + 1))")
            }

            ("delayMicroseconds", 1) => {
                emit!(gen, "rclcpp::sleep_for(std::chrono::microseconds((int64_t)(")?;
                gen.expr(&args[0])?;
                emit!(gen, ")))")
            }

            _ => gen.plain_call(name, args),
        }
    }

    fn analog_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        // Los valores analógicos llegan por suscripción a tópicos; se
        // lee la variable cacheada derivada del pin
        emit!(gen, "sensor_val_")?;
        gen.expr(pin)
    }

    fn gpio_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        emit!(gen, "pin_state_")?;
        gen.expr(pin)
    }

    fn var_decl(gen: &mut Gen<Self>, name: &str, init: Option<&Expr>) -> fmt::Result {
        gen.write_indent()?;
        emit!(gen, "double {}_ = ", name)?;
        match init {
            Some(init) => gen.expr(init)?,
            None => emit!(gen, "0.0")?,
        }

        emit!(gen, ";\n")
    }

    fn array_decl(gen: &mut Gen<Self>, name: &str, size: i32) -> fmt::Result {
        emit_line!(gen, "double {}_[{}];", name, size)
    }

    fn gpio_write(gen: &mut Gen<Self>, _pin: &Expr, value: &Expr) -> fmt::Result {
        gen.write_indent()?;
        emit!(gen, "{{ auto _m = std_msgs::msg::Bool(); _m.data = (bool)(")?;
        gen.expr(value)?;
        emit!(gen, "); gpio_pub_->publish(_m); }}\n")
    }

    fn analog_write(gen: &mut Gen<Self>, pin: &Expr, value: &Expr) -> fmt::Result {
        publish_pwm(gen, pin, value)
    }

    // Sin reescalado local: se publica el flotante crudo
    fn servo_write(gen: &mut Gen<Self>, pin: &Expr, angle: &Expr) -> fmt::Result {
        publish_pwm(gen, pin, angle)
    }

    fn wait(gen: &mut Gen<Self>, duration: &Expr) -> fmt::Result {
        gen.write_indent()?;
        emit!(gen, "rclcpp::sleep_for(std::chrono::milliseconds((int64_t)(")?;
        gen.expr(duration)?;
        emit!(gen, ")));\n")
    }

    fn print(gen: &mut Gen<Self>, value: &Expr) -> fmt::Result {
        gen.write_indent()?;
        emit!(gen, "RCLCPP_INFO(get_logger(), \"%s\", std::to_string(")?;
        gen.expr(value)?;
        emit!(gen, ").c_str());\n")
    }

    fn function_def(gen: &mut Gen<Self>, def: &FunctionDef) -> fmt::Result {
        if def.is_extern() {
            emit!(gen, "extern double {}(", def.name)?;
            double_params(gen, &def.params)?;
            return emit!(gen, ");\n\n");
        }

        emit!(gen, "double {}(", def.name)?;
        double_params(gen, &def.params)?;
        emit!(gen, ") {{\n")?;

        if let Some(body) = &def.body {
            gen.with_indent(|gen| gen.stmt(body))?;
        }

        emit!(gen, "}}\n\n")
    }

    fn forever(gen: &mut Gen<Self>, body: &Stmt) -> fmt::Result {
        // El timer ya repite: el cuerpo corre una vez por tick
        emit_line!(gen, "/* loop forever -> runs once per timer tick */")?;
        gen.stmt(body)
    }
}

fn publish_pwm(gen: &mut Gen<Ros2>, _pin: &Expr, value: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "{{ auto _m = std_msgs::msg::Float64(); _m.data = ")?;
    gen.expr(value)?;
    emit!(gen, "; pwm_pub_->publish(_m); }}\n")
}

fn double_params(gen: &mut Gen<Ros2>, params: &[String]) -> fmt::Result {
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            emit!(gen, ", ")?;
        }

        // Con sufijo, igual que toda referencia a identificadores
        emit!(gen, "double {}_", param)?;
    }

    Ok(())
}
