fn main() {
    clinic_intake_lib::run()
}
