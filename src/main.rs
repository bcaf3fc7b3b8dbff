fn main() {
    voicenotes_lib::run()
}
